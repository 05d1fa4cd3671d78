//! # The control-plane boundary.
//!
//! [`ControlPlane`] is everything the crate needs from the operating system's
//! service manager:
//!
//! | Call                 | Shape                                        |
//! |----------------------|----------------------------------------------|
//! | `register`           | name × handler callback → [`ServiceHandle`]   |
//! | `set_status`         | handle × [`ServiceStatus`] → ok / error       |
//! | `create_stop_signal` | → manual-reset [`StopSignal`]                 |
//! | `dispatch`           | [`DispatchTable`] → blocks, per-service exits |
//! | `release`            | handle is no longer used                      |
//!
//! Implementations:
//! - [`SimulatedControlPlane`]: in-process, records pushes, injects failures
//! - `WindowsControlPlane` (Windows only): the Service Control Manager

use std::collections::HashSet;
use std::sync::Arc;

use crate::control::{ControlCode, ControlResult};
use crate::error::{PlaneError, ServiceError};
use crate::signal::StopSignal;
use crate::status::ServiceStatus;

mod sim;
#[cfg(windows)]
mod windows;

pub use sim::{ERROR_FAILED_SERVICE_CONTROLLER_CONNECT, SimulatedControlPlane, StatusPush};
#[cfg(windows)]
pub use windows::WindowsControlPlane;

/// Callback the control plane invokes for every control delivery.
pub type ControlCallback = Arc<dyn Fn(ControlCode) -> ControlResult + Send + Sync>;

/// Entry point invoked by the control plane once per dispatched service; returns its exit code.
pub type EntryPoint = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Opaque token returned by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(u64);

impl ServiceHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Immutable (service name, entry point) pair.
#[derive(Clone)]
pub struct DispatchEntry {
    name: Arc<str>,
    entry: EntryPoint,
}

impl DispatchEntry {
    pub fn new(name: impl Into<Arc<str>>, entry: EntryPoint) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the entry point on the calling thread.
    pub fn invoke(&self) -> u32 {
        (self.entry)()
    }
}

impl std::fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Non-empty list of entries with unique names.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    entries: Vec<DispatchEntry>,
}

impl DispatchTable {
    /// Validates and builds a table.
    pub fn new(entries: Vec<DispatchEntry>) -> Result<Self, ServiceError> {
        if entries.is_empty() {
            return Err(ServiceError::InvalidTable {
                reason: "no services".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for e in &entries {
            if e.name.is_empty() {
                return Err(ServiceError::InvalidTable {
                    reason: "empty service name".to_string(),
                });
            }
            if !seen.insert(Arc::clone(&e.name)) {
                return Err(ServiceError::InvalidTable {
                    reason: format!("duplicate service name {:?}", e.name),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DispatchEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(DispatchEntry::name).collect()
    }
}

/// Exit code of one entry-point invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceExit {
    pub service: String,
    pub exit_code: u32,
}

/// The operating system's service manager, as seen by this crate.
pub trait ControlPlane: Send + Sync + 'static {
    /// Registers `handler` for `service` and returns the handle for status pushes.
    fn register(&self, service: &str, handler: ControlCallback)
    -> Result<ServiceHandle, PlaneError>;

    /// Pushes the full status record.
    fn set_status(&self, handle: ServiceHandle, status: &ServiceStatus) -> Result<(), PlaneError>;

    /// Creates the manual-reset wait primitive (unset).
    fn create_stop_signal(&self) -> Result<StopSignal, PlaneError> {
        Ok(StopSignal::new())
    }

    /// Enters the dispatch loop; blocks until every service in `table` has returned.
    fn dispatch(&self, table: &DispatchTable) -> Result<Vec<ServiceExit>, PlaneError>;

    /// The run that owned `handle` is over.
    fn release(&self, _handle: ServiceHandle) {}
}
