//! # Hosted-task runner.
//!
//! Spawns the task on the host runtime and records how it ended. The entry
//! point never awaits the returned handle.
//!
//! - `Ok(())` or `Canceled` → `TaskStopped`
//! - any other error, or a panic → `TaskFailed`, and the exit codes that the
//!   Stopped report will carry are set to 1066 plus the task's own code

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::context::ServiceContext;
use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::status::ERROR_SERVICE_SPECIFIC_ERROR;
use crate::subscribers::panic_message;
use crate::tasks::TaskRef;

/// Spawns `task` on `runtime` with `token` as its stop token.
pub(crate) fn spawn(
    runtime: &Handle,
    ctx: Arc<ServiceContext>,
    task: TaskRef,
    token: CancellationToken,
) -> JoinHandle<()> {
    ctx.publish(Event::new(EventKind::TaskStarting).with_task(task.name()));

    runtime.spawn(async move {
        let res = AssertUnwindSafe(task.run(token)).catch_unwind().await;
        let res = res.unwrap_or_else(|panic| {
            Err(TaskError::Fatal {
                error: format!("panicked: {}", panic_message(&*panic)),
            })
        });

        match res {
            Ok(()) | Err(TaskError::Canceled) => {
                ctx.publish(Event::new(EventKind::TaskStopped).with_task(task.name()));
            }
            Err(e) => publish_failed(&ctx, task.name(), &e),
        }
    })
}

fn publish_failed(ctx: &ServiceContext, name: &str, err: &TaskError) {
    // Too late once Stopped went out; the event still records the failure.
    let _ = ctx
        .status()
        .set_exit_code(ERROR_SERVICE_SPECIFIC_ERROR, err.exit_code());
    ctx.publish(
        Event::new(EventKind::TaskFailed)
            .with_task(name)
            .with_exit_code(err.exit_code())
            .with_reason(err.to_string()),
    );
}
