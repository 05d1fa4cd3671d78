//! Subscribers shipped with the crate.

mod log;

pub use log::LogWriter;
