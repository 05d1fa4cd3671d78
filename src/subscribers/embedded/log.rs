//! # LogWriter: lifecycle events to `tracing`
//!
//! Maps every [`Event`] to one `tracing` record. Failures are logged at
//! `error`/`warn`, the lifecycle at `info`, noise at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO status reported service="MinimalService" state="start_pending" checkpoint=1
//! INFO status reported service="MinimalService" state="running" checkpoint=0
//! INFO control received service="MinimalService" control=1
//! INFO status reported service="MinimalService" state="stop_pending" checkpoint=1
//! INFO service exited service="MinimalService" exit_code=0
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let state = e.state.map(|s| s.as_label()).unwrap_or("-");

        match e.kind {
            EventKind::DispatchStarted => info!(services = reason, "dispatcher started"),
            EventKind::DispatchFinished => info!("dispatcher finished"),
            EventKind::DispatchFailed => {
                error!(reason, exit_code = ?e.exit_code, "dispatcher failed")
            }
            EventKind::RegistrationFailed => {
                error!(service, reason, "control handler registration failed")
            }
            EventKind::SignalCreationFailed => {
                error!(service, reason, "stop signal creation failed")
            }
            EventKind::StatusReported => {
                info!(service, state, checkpoint = ?e.checkpoint, "status reported")
            }
            EventKind::StatusRejected => debug!(service, state, reason, "status report rejected"),
            EventKind::StatusPushFailed => warn!(service, state, reason, "status push failed"),
            EventKind::ControlReceived => info!(service, control = ?e.control, "control received"),
            EventKind::ControlRejected => {
                debug!(service, control = ?e.control, "control not handled")
            }
            EventKind::StopSignalled => debug!(service, "stop signalled"),
            EventKind::ServiceExited => match e.exit_code {
                Some(0) => info!(service, exit_code = 0, "service exited"),
                code => warn!(service, exit_code = ?code, reason, "service exited"),
            },
            EventKind::TaskStarting => info!(service, task, "task starting"),
            EventKind::TaskStopped => info!(service, task, "task stopped"),
            EventKind::TaskFailed => {
                error!(service, task, reason, exit_code = ?e.exit_code, "task failed")
            }
            EventKind::SubscriberOverflow => warn!(subscriber = task, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => {
                error!(subscriber = task, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
