//! Error types used by the service runtime, the status block and tasks.
//!
//! This module defines:
//!
//! - [`ServiceError`]: terminal failures of a run or of the dispatcher bootstrap.
//! - [`StatusError`]: a status report that was rejected or could not be pushed.
//! - [`TaskError`]: errors raised by the hosted task.
//! - [`PlaneError`]: a failed call into the control plane.
//!
//! All enums provide `as_label` (stable snake_case label for logs). Errors that end
//! a process or a run also provide `exit_code`.

use std::io;

use thiserror::Error;

use crate::status::ServiceState;

/// Exit code of a run whose control-plane registration failed.
pub const EXIT_REGISTRATION_FAILED: u32 = 1;
/// Exit code of a run whose stop signal could not be created.
pub const EXIT_SIGNAL_CREATION_FAILED: u32 = 2;
/// Exit code of a dispatcher bootstrap failure that carries no OS error code.
pub const EXIT_DISPATCH_FAILED: u32 = 3;
/// Exit code of a run whose entry point panicked.
pub const EXIT_SERVICE_PANICKED: u32 = 4;

/// # A failed call into the control plane.
///
/// Carries the OS error code when the control plane produced one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlaneError {
    /// Raw OS error code, if any.
    pub code: Option<i32>,
    /// Human-readable description.
    pub message: String,
}

impl PlaneError {
    /// Error without an OS code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Error with an OS code.
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl From<io::Error> for PlaneError {
    fn from(err: io::Error) -> Self {
        Self {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// # Terminal failures of a service run or of the dispatcher.
///
/// None of these are retried: losing contact with the control plane at startup
/// has no recovery path.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The control plane refused to register the control handler.
    #[error("service {service:?}: control handler registration failed: {source}")]
    RegistrationFailed {
        service: String,
        #[source]
        source: PlaneError,
    },

    /// The stop signal could not be created.
    #[error("service {service:?}: stop signal creation failed: {source}")]
    SignalCreationFailed {
        service: String,
        #[source]
        source: PlaneError,
    },

    /// The control-plane dispatch loop could not be entered.
    #[error("service dispatcher failed: {source}")]
    DispatchFailed {
        #[source]
        source: PlaneError,
    },

    /// The dispatch table is unusable (empty, duplicated names).
    #[error("invalid dispatch table: {reason}")]
    InvalidTable { reason: String },

    /// The host runtime could not be built.
    #[error("failed to build host runtime: {source}")]
    Runtime {
        #[source]
        source: io::Error,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::{PlaneError, ServiceError};
    ///
    /// let err = ServiceError::DispatchFailed { source: PlaneError::new("not a service") };
    /// assert_eq!(err.as_label(), "dispatch_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::RegistrationFailed { .. } => "registration_failed",
            ServiceError::SignalCreationFailed { .. } => "signal_creation_failed",
            ServiceError::DispatchFailed { .. } => "dispatch_failed",
            ServiceError::InvalidTable { .. } => "invalid_table",
            ServiceError::Runtime { .. } => "runtime_failed",
        }
    }

    /// Exit code reported for this failure (entry point or process).
    ///
    /// Dispatch failures forward the OS error code when there is a non-zero one.
    pub fn exit_code(&self) -> u32 {
        match self {
            ServiceError::RegistrationFailed { .. } => EXIT_REGISTRATION_FAILED,
            ServiceError::SignalCreationFailed { .. } => EXIT_SIGNAL_CREATION_FAILED,
            ServiceError::DispatchFailed { source } => match source.code {
                Some(code) if code != 0 => code as u32,
                _ => EXIT_DISPATCH_FAILED,
            },
            ServiceError::InvalidTable { .. } | ServiceError::Runtime { .. } => {
                EXIT_DISPATCH_FAILED
            }
        }
    }
}

/// # A status report that did not go through.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The requested state is behind the current one.
    #[error("state cannot move back from {from:?} to {to:?}")]
    Regression { from: ServiceState, to: ServiceState },

    /// Stopped was already reported; the run is over.
    #[error("service already reported stopped")]
    AlreadyStopped,

    /// No service handle is attached yet.
    #[error("no service handle attached")]
    NotAttached,

    /// The state was applied but the control plane rejected the push.
    #[error("status push for {state:?} failed: {source}")]
    Push {
        state: ServiceState,
        #[source]
        source: PlaneError,
    },
}

impl StatusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StatusError::Regression { .. } => "status_regression",
            StatusError::AlreadyStopped => "status_already_stopped",
            StatusError::NotAttached => "status_not_attached",
            StatusError::Push { .. } => "status_push_failed",
        }
    }
}

/// # Errors produced by the hosted task.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task failed; the run keeps going until stopped.
    #[error("execution failed: {error}")]
    Fail { error: String },

    /// Task failed in a way it considers unrecoverable.
    #[error("fatal error: {error}")]
    Fatal { error: String },

    /// Task observed the stop signal and exited early.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "disk full".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Service-specific exit code reported with Stopped after this error.
    ///
    /// `Canceled` is a clean exit and maps to 0.
    pub fn exit_code(&self) -> u32 {
        match self {
            TaskError::Fail { .. } => 1,
            TaskError::Fatal { .. } => 2,
            TaskError::Canceled => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_failures_have_distinct_exit_codes() {
        let reg = ServiceError::RegistrationFailed {
            service: "svc".into(),
            source: PlaneError::new("no"),
        };
        let sig = ServiceError::SignalCreationFailed {
            service: "svc".into(),
            source: PlaneError::new("no"),
        };
        assert_eq!(reg.exit_code(), 1);
        assert_eq!(sig.exit_code(), 2);
    }

    #[test]
    fn dispatch_failure_forwards_os_code() {
        let with_os = ServiceError::DispatchFailed {
            source: PlaneError::with_code(1063, "not started by the control plane"),
        };
        assert_eq!(with_os.exit_code(), 1063);

        let without = ServiceError::DispatchFailed {
            source: PlaneError::new("unsupported"),
        };
        assert_eq!(without.exit_code(), EXIT_DISPATCH_FAILED);

        let zero = ServiceError::DispatchFailed {
            source: PlaneError::with_code(0, "weird"),
        };
        assert_eq!(zero.exit_code(), EXIT_DISPATCH_FAILED);
    }

    #[test]
    fn push_error_label() {
        let push = StatusError::Push {
            state: ServiceState::Running,
            source: PlaneError::new("gone"),
        };
        assert_eq!(push.as_label(), "status_push_failed");
    }

    #[test]
    fn io_error_keeps_raw_code() {
        let err = PlaneError::from(io::Error::from_raw_os_error(5));
        assert_eq!(err.code, Some(5));
    }

    #[test]
    fn canceled_task_is_clean_exit() {
        assert_eq!(TaskError::Canceled.exit_code(), 0);
        assert_eq!(TaskError::Fatal { error: "x".into() }.exit_code(), 2);
    }
}
