//! # Control requests from the control plane.
//!
//! - [`ControlCode`] / [`ControlResult`]: the delivery and its answer
//! - [`ControlHandler`]: turns Stop/Shutdown into StopPending + stop signal

mod code;
mod handler;

pub use code::{ControlCode, ControlResult, ERROR_CALL_NOT_IMPLEMENTED};
pub use handler::ControlHandler;
