//! # In-process control plane.
//!
//! [`SimulatedControlPlane`] behaves like the service manager as far as this
//! crate can observe it:
//! - `dispatch` starts one thread per table entry and joins them all;
//! - `register` hands out handles and keeps the handler for [`deliver`](SimulatedControlPlane::deliver);
//! - `set_status` records every successful push, in order;
//! - a *detached* plane refuses to dispatch, like a process not launched by the
//!   service manager (`ERROR_FAILED_SERVICE_CONTROLLER_CONNECT`).
//!
//! Failures can be injected for registration, stop-signal creation and pushes.
//! Clones share state, so a test keeps one clone and hands another to the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{ControlCallback, ControlPlane, DispatchTable, ServiceExit, ServiceHandle};
use crate::control::{ControlCode, ControlResult};
use crate::error::PlaneError;
use crate::signal::StopSignal;
use crate::status::{RawServiceStatus, ServiceState, ServiceStatus};

/// Raw code returned when dispatching outside a service-hosting process.
pub const ERROR_FAILED_SERVICE_CONTROLLER_CONNECT: i32 = 1063;
const ERROR_INVALID_HANDLE: i32 = 6;
const ERROR_NOT_ENOUGH_MEMORY: i32 = 8;
const ERROR_SERVICE_NOT_IN_EXE: i32 = 1083;
/// Exit code recorded when an entry-point thread panicked.
const EXIT_ENTRY_PANICKED: u32 = u32::MAX;

/// One status push as received by the simulated control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPush {
    pub service: Arc<str>,
    pub handle: ServiceHandle,
    pub status: ServiceStatus,
    pub raw: RawServiceStatus,
}

struct Registration {
    service: Arc<str>,
    handler: ControlCallback,
}

#[derive(Default)]
struct Ledger {
    registrations: HashMap<u64, Registration>,
    pushes: Vec<StatusPush>,
}

struct Inner {
    hosted: bool,
    fail_registration: AtomicBool,
    fail_signal: AtomicBool,
    fail_push: AtomicBool,
    next_handle: AtomicU64,
    entry_threads: AtomicUsize,
    ledger: Mutex<Ledger>,
    changed: Condvar,
}

/// In-process control plane for tests and non-Windows hosts.
#[derive(Clone)]
pub struct SimulatedControlPlane {
    inner: Arc<Inner>,
}

impl Default for SimulatedControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedControlPlane {
    /// A control plane that hosts the process: dispatch runs the services.
    pub fn new() -> Self {
        Self::with_hosted(true)
    }

    /// A control plane that did not launch this process: dispatch fails.
    pub fn detached() -> Self {
        Self::with_hosted(false)
    }

    fn with_hosted(hosted: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                hosted,
                fail_registration: AtomicBool::new(false),
                fail_signal: AtomicBool::new(false),
                fail_push: AtomicBool::new(false),
                next_handle: AtomicU64::new(1),
                entry_threads: AtomicUsize::new(0),
                ledger: Mutex::new(Ledger::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Makes every following registration fail.
    pub fn fail_registration(&self) {
        self.inner.fail_registration.store(true, Ordering::SeqCst);
    }

    /// Makes every following stop-signal creation fail.
    pub fn fail_signal_creation(&self) {
        self.inner.fail_signal.store(true, Ordering::SeqCst);
    }

    /// Makes status pushes fail (or succeed again).
    pub fn fail_status_push(&self, fail: bool) {
        self.inner.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Delivers a control code to `service` on the calling thread.
    ///
    /// Returns `None` when no live registration exists for `service`.
    pub fn deliver(&self, service: &str, code: ControlCode) -> Option<ControlResult> {
        let handler = {
            let ledger = self.inner.ledger.lock();
            ledger
                .registrations
                .values()
                .find(|r| &*r.service == service)
                .map(|r| Arc::clone(&r.handler))?
        };
        Some(handler(code))
    }

    /// Every successful push, in the order received.
    pub fn pushes(&self) -> Vec<StatusPush> {
        self.inner.ledger.lock().pushes.clone()
    }

    /// States pushed for `service`, in order.
    pub fn states(&self, service: &str) -> Vec<ServiceState> {
        self.inner
            .ledger
            .lock()
            .pushes
            .iter()
            .filter(|p| &*p.service == service)
            .map(|p| p.status.current_state)
            .collect()
    }

    /// Last status pushed for `service`.
    pub fn last_status(&self, service: &str) -> Option<ServiceStatus> {
        self.inner
            .ledger
            .lock()
            .pushes
            .iter()
            .rev()
            .find(|p| &*p.service == service)
            .map(|p| p.status)
    }

    /// Number of entry-point threads started by `dispatch`.
    pub fn entry_threads_started(&self) -> usize {
        self.inner.entry_threads.load(Ordering::SeqCst)
    }

    /// Blocks until `service` has pushed `state`, or `timeout` elapses.
    pub fn wait_for_state(&self, service: &str, state: ServiceState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ledger = self.inner.ledger.lock();
        loop {
            let seen = ledger
                .pushes
                .iter()
                .any(|p| &*p.service == service && p.status.current_state == state);
            if seen {
                return true;
            }
            if self
                .inner
                .changed
                .wait_until(&mut ledger, deadline)
                .timed_out()
            {
                return false;
            }
        }
    }
}

impl ControlPlane for SimulatedControlPlane {
    fn register(
        &self,
        service: &str,
        handler: ControlCallback,
    ) -> Result<ServiceHandle, PlaneError> {
        if self.inner.fail_registration.load(Ordering::SeqCst) {
            return Err(PlaneError::with_code(
                ERROR_SERVICE_NOT_IN_EXE,
                format!("service {service:?} is not served by this process"),
            ));
        }
        let raw = self.inner.next_handle.fetch_add(1, Ordering::SeqCst);
        self.inner.ledger.lock().registrations.insert(
            raw,
            Registration {
                service: Arc::from(service),
                handler,
            },
        );
        Ok(ServiceHandle::from_raw(raw))
    }

    fn set_status(&self, handle: ServiceHandle, status: &ServiceStatus) -> Result<(), PlaneError> {
        if self.inner.fail_push.load(Ordering::SeqCst) {
            return Err(PlaneError::with_code(
                ERROR_INVALID_HANDLE,
                "status push refused",
            ));
        }
        let mut ledger = self.inner.ledger.lock();
        let service = match ledger.registrations.get(&handle.raw()) {
            Some(r) => Arc::clone(&r.service),
            None => {
                return Err(PlaneError::with_code(
                    ERROR_INVALID_HANDLE,
                    format!("unknown service handle {}", handle.raw()),
                ));
            }
        };
        ledger.pushes.push(StatusPush {
            service,
            handle,
            status: *status,
            raw: status.to_raw(),
        });
        self.inner.changed.notify_all();
        Ok(())
    }

    fn create_stop_signal(&self) -> Result<StopSignal, PlaneError> {
        if self.inner.fail_signal.load(Ordering::SeqCst) {
            return Err(PlaneError::with_code(
                ERROR_NOT_ENOUGH_MEMORY,
                "cannot create stop event",
            ));
        }
        Ok(StopSignal::new())
    }

    fn dispatch(&self, table: &DispatchTable) -> Result<Vec<ServiceExit>, PlaneError> {
        if !self.inner.hosted {
            return Err(PlaneError::with_code(
                ERROR_FAILED_SERVICE_CONTROLLER_CONNECT,
                "the process was not started by the service control manager",
            ));
        }

        let mut running = Vec::with_capacity(table.entries().len());
        for entry in table.entries() {
            let service = entry.name().to_string();
            let entry = entry.clone();
            let handle = thread::Builder::new()
                .name(format!("svc-{service}"))
                .spawn(move || entry.invoke())?;
            self.inner.entry_threads.fetch_add(1, Ordering::SeqCst);
            running.push((service, handle));
        }

        Ok(running
            .into_iter()
            .map(|(service, handle)| ServiceExit {
                service,
                exit_code: handle.join().unwrap_or(EXIT_ENTRY_PANICKED),
            })
            .collect())
    }

    fn release(&self, handle: ServiceHandle) {
        self.inner.ledger.lock().registrations.remove(&handle.raw());
    }
}
