//! # Status block: the single authoritative status of a run.
//!
//! [`StatusBlock`] owns the [`ServiceStatus`] and the [`ServiceHandle`] it is
//! pushed through. Everything goes through one mutex:
//!
//! ```text
//! report(target)
//!   lock ──► check handle ──► check forward-only ──► apply ──► push ──► unlock
//! ```
//!
//! Holding the lock across the push means the control plane never receives a
//! torn record and never receives two pushes out of order, even when the
//! control handler and the entry point report at the same instant.
//!
//! ## Rules
//! - `controls_accepted` is recomputed from the target state on every report.
//! - A target ranked below the current state is rejected (`Regression`).
//! - After Stopped every report is rejected (`AlreadyStopped`).
//! - Re-reporting a pending state advances its checkpoint.
//! - Checkpoint and wait hint are zero outside pending states.
//! - A failed push keeps the applied state and returns `Push`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::record::ServiceStatus;
use super::state::{ControlsAccepted, ServiceState, ServiceType};
use crate::error::StatusError;
use crate::plane::{ControlPlane, ServiceHandle};

struct Inner {
    status: ServiceStatus,
    handle: Option<ServiceHandle>,
}

/// Mutex-guarded status of one service run.
pub struct StatusBlock {
    plane: Arc<dyn ControlPlane>,
    wait_hint: Duration,
    inner: Mutex<Inner>,
}

impl StatusBlock {
    /// Creates a block in the implicit initial state (StartPending, not yet reported).
    pub fn new(plane: Arc<dyn ControlPlane>, service_type: ServiceType, wait_hint: Duration) -> Self {
        Self {
            plane,
            wait_hint,
            inner: Mutex::new(Inner {
                status: ServiceStatus::new(service_type),
                handle: None,
            }),
        }
    }

    /// Attaches the handle obtained from registration.
    pub fn attach(&self, handle: ServiceHandle) {
        self.inner.lock().handle = Some(handle);
    }

    /// Handle in use, if attached.
    pub fn handle(&self) -> Option<ServiceHandle> {
        self.inner.lock().handle
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> ServiceStatus {
        self.inner.lock().status
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.inner.lock().status.current_state
    }

    /// Records exit codes to be carried by subsequent reports.
    ///
    /// Rejected once Stopped has been reported.
    pub fn set_exit_code(&self, win32: u32, service_specific: u32) -> Result<(), StatusError> {
        let mut inner = self.inner.lock();
        if inner.status.current_state == ServiceState::Stopped {
            return Err(StatusError::AlreadyStopped);
        }
        inner.status.exit_code = win32;
        inner.status.service_specific_exit_code = service_specific;
        Ok(())
    }

    /// Moves to `target` and pushes the full record to the control plane.
    ///
    /// Returns the status that was pushed.
    pub fn report(&self, target: ServiceState) -> Result<ServiceStatus, StatusError> {
        let mut inner = self.inner.lock();
        let handle = inner.handle.ok_or(StatusError::NotAttached)?;
        let current = inner.status.current_state;

        if current == ServiceState::Stopped {
            return Err(StatusError::AlreadyStopped);
        }
        if target.rank() < current.rank() {
            return Err(StatusError::Regression {
                from: current,
                to: target,
            });
        }

        let mut next = inner.status;
        next.current_state = target;
        next.controls_accepted = ControlsAccepted::for_state(target);
        if target.is_pending() {
            next.checkpoint = if target == current {
                next.checkpoint.saturating_add(1)
            } else {
                1
            };
            next.wait_hint = self.wait_hint;
        } else {
            next.checkpoint = 0;
            next.wait_hint = Duration::ZERO;
        }
        inner.status = next;

        self.plane
            .set_status(handle, &next)
            .map_err(|source| StatusError::Push {
                state: target,
                source,
            })?;
        Ok(next)
    }
}
