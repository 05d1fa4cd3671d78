//! # Status record: the value pushed to the control plane.
//!
//! [`ServiceStatus`] is the typed snapshot used inside the crate.
//! [`RawServiceStatus`] is its wire form: seven `u32` fields in the exact order
//! and width the control plane expects.

use std::time::Duration;

use super::state::{ControlsAccepted, ServiceState, ServiceType};

/// Win32 exit code meaning "see the service-specific exit code".
pub const ERROR_SERVICE_SPECIFIC_ERROR: u32 = 1066;

/// Typed snapshot of a service's status.
///
/// Values of this type are copies; the authoritative instance lives inside a
/// [`StatusBlock`](super::StatusBlock) and only changes through its transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Fixed for the whole run.
    pub service_type: ServiceType,
    /// Current lifecycle state.
    pub current_state: ServiceState,
    /// Always `ControlsAccepted::for_state(current_state)`.
    pub controls_accepted: ControlsAccepted,
    /// Win32 exit code (0 on success).
    pub exit_code: u32,
    /// Meaningful when `exit_code == ERROR_SERVICE_SPECIFIC_ERROR`.
    pub service_specific_exit_code: u32,
    /// Progress counter for pending states, 0 otherwise.
    pub checkpoint: u32,
    /// How long the control plane should wait for the next checkpoint.
    pub wait_hint: Duration,
}

impl ServiceStatus {
    /// Initial status of a run: StartPending, nothing accepted, success codes.
    pub fn new(service_type: ServiceType) -> Self {
        Self {
            service_type,
            current_state: ServiceState::StartPending,
            controls_accepted: ControlsAccepted::empty(),
            exit_code: 0,
            service_specific_exit_code: 0,
            checkpoint: 0,
            wait_hint: Duration::ZERO,
        }
    }

    /// Converts into the control plane's binary layout.
    ///
    /// The wait hint saturates at `u32::MAX` milliseconds.
    pub fn to_raw(&self) -> RawServiceStatus {
        RawServiceStatus {
            service_type: self.service_type.raw(),
            current_state: self.current_state.raw(),
            controls_accepted: self.controls_accepted.bits(),
            win32_exit_code: self.exit_code,
            service_specific_exit_code: self.service_specific_exit_code,
            checkpoint: self.checkpoint,
            wait_hint_ms: self.wait_hint.as_millis().min(u128::from(u32::MAX)) as u32,
        }
    }
}

/// Wire layout of a status push.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawServiceStatus {
    pub service_type: u32,
    pub current_state: u32,
    pub controls_accepted: u32,
    pub win32_exit_code: u32,
    pub service_specific_exit_code: u32,
    pub checkpoint: u32,
    pub wait_hint_ms: u32,
}
