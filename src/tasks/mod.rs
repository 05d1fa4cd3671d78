//! # The hosted task.
//!
//! - [`Task`]: async work that runs while the service is Running
//! - [`TaskFn`]: closure-backed [`Task`]
//! - [`TaskRef`]: shared handle (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::Task;
pub use task_fn::{TaskFn, TaskRef};
