//! # Service status: states, the wire record and the guarded status block.
//!
//! - [`ServiceState`], [`ServiceType`], [`ControlsAccepted`]: the vocabulary
//! - [`ServiceStatus`] / [`RawServiceStatus`]: typed snapshot and wire layout
//! - [`StatusBlock`]: the one mutable instance per run, forward-only

mod block;
mod record;
mod state;

pub use block::StatusBlock;
pub use record::{ERROR_SERVICE_SPECIFIC_ERROR, RawServiceStatus, ServiceStatus};
pub use state::{ControlsAccepted, ServiceState, ServiceType};
