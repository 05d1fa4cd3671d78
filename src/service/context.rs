//! # Run context shared across threads.
//!
//! The control plane only ever sees closures; both of them close over the same
//! [`ServiceContext`]:
//!
//! ```text
//!  entry-point thread ──┐                    ┌──► StatusBlock ──► ControlPlane::set_status
//!                       ├──► ServiceContext ─┼──► StopSignal (installed once)
//!  handler thread     ──┘                    └──► Bus (events tagged with the service name)
//! ```
//!
//! A stop may be requested before the entry point has installed the signal.
//! The request is latched and applied by [`ServiceContext::install_stop`], so
//! the entry point never parks on a signal that missed its stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::ServiceConfig;
use crate::error::StatusError;
use crate::events::{Bus, Event, EventKind};
use crate::plane::{ControlPlane, ServiceHandle};
use crate::signal::StopSignal;
use crate::status::{ServiceState, ServiceStatus, StatusBlock};

/// Per-run state: status, stop signal and event publishing.
pub struct ServiceContext {
    name: Arc<str>,
    status: StatusBlock,
    stop: OnceLock<StopSignal>,
    stop_requested: AtomicBool,
    bus: Bus,
}

impl ServiceContext {
    pub fn new(config: &ServiceConfig, plane: Arc<dyn ControlPlane>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            name: Arc::from(config.name.as_str()),
            status: StatusBlock::new(plane, config.service_type, config.wait_hint),
            stop: OnceLock::new(),
            stop_requested: AtomicBool::new(false),
            bus,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &StatusBlock {
        &self.status
    }

    pub fn snapshot(&self) -> ServiceStatus {
        self.status.snapshot()
    }

    /// Publishes `event` tagged with this service's name.
    pub fn publish(&self, event: Event) {
        self.bus.publish(event.with_service(Arc::clone(&self.name)));
    }

    pub fn attach(&self, handle: ServiceHandle) {
        self.status.attach(handle);
    }

    /// Reports `state` and publishes the outcome.
    pub fn report(&self, state: ServiceState) -> Result<ServiceStatus, StatusError> {
        let res = self.status.report(state);
        match &res {
            Ok(st) => self.publish(
                Event::new(EventKind::StatusReported)
                    .with_state(st.current_state)
                    .with_checkpoint(st.checkpoint),
            ),
            Err(e @ StatusError::Push { .. }) => self.publish(
                Event::new(EventKind::StatusPushFailed)
                    .with_state(state)
                    .with_reason(e.to_string()),
            ),
            Err(e) => self.publish(
                Event::new(EventKind::StatusRejected)
                    .with_state(state)
                    .with_reason(e.to_string()),
            ),
        }
        res
    }

    /// Installs the run's stop signal and returns the one in effect.
    ///
    /// A stop requested earlier is applied immediately.
    pub fn install_stop(&self, signal: StopSignal) -> StopSignal {
        let signal = self.stop.get_or_init(|| signal).clone();
        if self.stop_requested.load(Ordering::SeqCst) {
            self.fire(&signal);
        }
        signal
    }

    /// Sets the stop signal, or latches the request until one is installed.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(signal) = self.stop.get() {
            self.fire(signal);
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn fire(&self, signal: &StopSignal) {
        if signal.set() {
            self.publish(Event::new(EventKind::StopSignalled));
        }
    }
}
