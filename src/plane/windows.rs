//! # Service Control Manager backend.
//!
//! Built on `windows-service`. The SCM calls a plain `extern "system"` entry,
//! so the single dispatched entry lives in a process-wide static: the only one
//! in the crate.
//!
//! `windows-service` starts a single-service dispatch table, so tables with
//! more than one entry are refused with a dispatch error.

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState as WinState,
    ServiceStatus as WinStatus, ServiceType as WinType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::{define_windows_service, service_dispatcher};

use super::{ControlCallback, ControlPlane, DispatchEntry, DispatchTable, ServiceExit, ServiceHandle};
use crate::control::{ControlCode, ControlResult};
use crate::error::PlaneError;
use crate::status::{ERROR_SERVICE_SPECIFIC_ERROR, ServiceState, ServiceStatus};

static ENTRY: OnceLock<DispatchEntry> = OnceLock::new();
static EXIT_CODE: AtomicU32 = AtomicU32::new(0);

define_windows_service!(ffi_service_main, service_main);

fn service_main(_arguments: Vec<OsString>) {
    if let Some(entry) = ENTRY.get() {
        EXIT_CODE.store(entry.invoke(), Ordering::SeqCst);
    }
}

/// The Windows Service Control Manager.
#[derive(Default)]
pub struct WindowsControlPlane {
    handles: Mutex<HashMap<u64, ServiceStatusHandle>>,
    next: AtomicU64,
}

impl WindowsControlPlane {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlPlane for WindowsControlPlane {
    fn register(
        &self,
        service: &str,
        handler: ControlCallback,
    ) -> Result<ServiceHandle, PlaneError> {
        let status_handle = service_control_handler::register(service, move |control: ServiceControl| {
            match handler(ControlCode::from_raw(control.raw_service_control_type())) {
                ControlResult::Handled => ServiceControlHandlerResult::NoError,
                ControlResult::NotHandled => ServiceControlHandlerResult::NotImplemented,
            }
        })
        .map_err(plane_error)?;

        let raw = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.handles.lock().insert(raw, status_handle);
        Ok(ServiceHandle::from_raw(raw))
    }

    fn set_status(&self, handle: ServiceHandle, status: &ServiceStatus) -> Result<(), PlaneError> {
        let status_handle = self
            .handles
            .lock()
            .get(&handle.raw())
            .copied()
            .ok_or_else(|| PlaneError::new(format!("unknown service handle {}", handle.raw())))?;
        status_handle
            .set_service_status(to_windows(status))
            .map_err(plane_error)
    }

    fn dispatch(&self, table: &DispatchTable) -> Result<Vec<ServiceExit>, PlaneError> {
        let [entry] = table.entries() else {
            return Err(PlaneError::new(format!(
                "the Windows backend hosts exactly one service, got {}",
                table.entries().len()
            )));
        };
        let installed = ENTRY.get_or_init(|| entry.clone());
        if installed.name() != entry.name() {
            return Err(PlaneError::new(format!(
                "process already dispatched service {:?}",
                installed.name()
            )));
        }

        service_dispatcher::start(entry.name(), ffi_service_main).map_err(plane_error)?;
        Ok(vec![ServiceExit {
            service: entry.name().to_string(),
            exit_code: EXIT_CODE.load(Ordering::SeqCst),
        }])
    }

    fn release(&self, handle: ServiceHandle) {
        self.handles.lock().remove(&handle.raw());
    }
}

fn to_windows(status: &ServiceStatus) -> WinStatus {
    let exit_code = if status.exit_code == ERROR_SERVICE_SPECIFIC_ERROR {
        ServiceExitCode::ServiceSpecific(status.service_specific_exit_code)
    } else {
        ServiceExitCode::Win32(status.exit_code)
    };
    WinStatus {
        service_type: WinType::from_bits_truncate(status.service_type.raw()),
        current_state: match status.current_state {
            ServiceState::StartPending => WinState::StartPending,
            ServiceState::Running => WinState::Running,
            ServiceState::StopPending => WinState::StopPending,
            ServiceState::Stopped => WinState::Stopped,
        },
        controls_accepted: ServiceControlAccept::from_bits_truncate(status.controls_accepted.bits()),
        exit_code,
        checkpoint: status.checkpoint,
        wait_hint: status.wait_hint,
        process_id: None,
    }
}

fn plane_error(err: windows_service::Error) -> PlaneError {
    match err {
        windows_service::Error::Winapi(io) => PlaneError::from(io),
        other => PlaneError::new(other.to_string()),
    }
}
