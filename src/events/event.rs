//! # Lifecycle events emitted by service runs and the dispatcher.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Startup failures**: the run could not obtain a handle or a stop signal
//! - **Status events**: reports accepted, rejected or not delivered to the control plane
//! - **Control events**: control codes arriving from the control plane
//! - **Task events**: the hosted task starting and finishing
//!
//! ## Ordering guarantees
//! Every event carries a process-wide sequence number (`seq`) that increases
//! monotonically. Subscribers may see events late; `seq` restores the order.
//!
//! ## Example
//! ```rust
//! use servicevisor::{Event, EventKind, ServiceState};
//!
//! let ev = Event::new(EventKind::StatusReported)
//!     .with_service("svc")
//!     .with_state(ServiceState::Running);
//!
//! assert_eq!(ev.kind, EventKind::StatusReported);
//! assert_eq!(ev.service.as_deref(), Some("svc"));
//! assert_eq!(ev.state, Some(ServiceState::Running));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::status::ServiceState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Dispatcher events ===
    /// The dispatcher is handing the thread to the control plane.
    ///
    /// Sets: `reason` (service names)
    DispatchStarted,

    /// The dispatcher returned normally (all services stopped).
    DispatchFinished,

    /// The control plane's dispatch loop could not be entered.
    ///
    /// Sets: `reason`, `exit_code`
    DispatchFailed,

    // === Startup failures ===
    /// Control handler registration failed; the run ends without any status report.
    ///
    /// Sets: `service`, `reason`, `exit_code`
    RegistrationFailed,

    /// The stop signal could not be created; the run ends without further reports.
    ///
    /// Sets: `service`, `reason`, `exit_code`
    SignalCreationFailed,

    // === Status events ===
    /// A status was applied and pushed to the control plane.
    ///
    /// Sets: `service`, `state`, `checkpoint`
    StatusReported,

    /// A status report was refused (regression, already stopped, no handle).
    ///
    /// Sets: `service`, `state` (requested), `reason`
    StatusRejected,

    /// A status was applied locally but the control plane rejected the push.
    ///
    /// Sets: `service`, `state`, `reason`
    StatusPushFailed,

    // === Control events ===
    /// A stop or shutdown control code was accepted.
    ///
    /// Sets: `service`, `control`
    ControlReceived,

    /// A control code this service does not handle was delivered.
    ///
    /// Sets: `service`, `control`
    ControlRejected,

    /// The stop signal was set for the first time.
    ///
    /// Sets: `service`
    StopSignalled,

    /// The entry point returned.
    ///
    /// Sets: `service`, `exit_code`, `reason` (on failure)
    ServiceExited,

    // === Task events ===
    /// The hosted task was handed to the runtime.
    ///
    /// Sets: `service`, `task`
    TaskStarting,

    /// The task returned `Ok` or `Canceled`.
    ///
    /// Sets: `service`, `task`
    TaskStopped,

    /// The task returned an error or panicked.
    ///
    /// Sets: `service`, `task`, `reason`, `exit_code` (service-specific)
    TaskFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service the event belongs to.
    pub service: Option<Arc<str>>,
    /// Task or subscriber name.
    pub task: Option<Arc<str>>,
    /// Service state involved in the event.
    pub state: Option<ServiceState>,
    /// Checkpoint pushed with the status.
    pub checkpoint: Option<u32>,
    /// Raw control code.
    pub control: Option<u32>,
    /// Exit code (entry point, dispatcher or task).
    pub exit_code: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            task: None,
            state: None,
            checkpoint: None,
            control: None,
            exit_code: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.state = Some(state);
        self
    }

    #[inline]
    pub fn with_checkpoint(mut self, checkpoint: u32) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    #[inline]
    pub fn with_control(mut self, control: u32) -> Self {
        self.control = Some(control);
        self
    }

    #[inline]
    pub fn with_exit_code(mut self, code: u32) -> Self {
        self.exit_code = Some(code);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
