//! # One service run.
//!
//! - [`ServiceContext`]: state shared by the entry point and the control handler
//! - [`ServiceMain`]: the entry-point body the control plane calls once per run
//! - `runner`: spawns the hosted task on the host runtime

mod context;
mod entry;
mod runner;

pub use context::ServiceContext;
pub use entry::ServiceMain;
