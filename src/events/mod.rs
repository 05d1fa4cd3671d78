//! # Lifecycle events and the broadcast bus.
//!
//! - [`Event`] / [`EventKind`]: what happened, with optional metadata
//! - [`Bus`]: broadcast channel shared by every publisher in the process

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
