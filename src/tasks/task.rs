//! # Hosted task abstraction.
//!
//! A [`Task`] is the service's actual work. It is spawned once per run, right
//! after StartPending is reported, and receives a [`CancellationToken`] that is
//! cancelled when the stop signal is set.
//!
//! The service reports Stopped without waiting for the task; a task that needs
//! to flush state should do it promptly once the token is cancelled.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Asynchronous, stoppable unit of service work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use servicevisor::{Task, TaskError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         ctx.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable, human-readable task name.
    fn name(&self) -> &str;

    /// Runs until completion or until `ctx` is cancelled.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
