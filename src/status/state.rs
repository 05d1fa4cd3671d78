//! # Service states, service types and accepted controls.
//!
//! The numeric values are the control plane's wire values and must not change.
//!
//! ```text
//! StartPending(2) ──► Running(4) ──► StopPending(3) ──► Stopped(1)
//! ```
//!
//! The forward order is given by [`ServiceState::rank`], **not** by the raw value
//! (StopPending is numerically smaller than Running).

use bitflags::bitflags;

/// Lifecycle state reported to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// The service is starting; checkpoints are expected.
    StartPending,
    /// The service is up and accepts stop/shutdown controls.
    Running,
    /// A stop was requested and is in progress; checkpoints are expected.
    StopPending,
    /// Terminal state.
    Stopped,
}

impl ServiceState {
    /// Raw control-plane value.
    pub const fn raw(self) -> u32 {
        match self {
            ServiceState::Stopped => 0x1,
            ServiceState::StartPending => 0x2,
            ServiceState::StopPending => 0x3,
            ServiceState::Running => 0x4,
        }
    }

    /// Position in the forward-only lifecycle.
    pub const fn rank(self) -> u8 {
        match self {
            ServiceState::StartPending => 0,
            ServiceState::Running => 1,
            ServiceState::StopPending => 2,
            ServiceState::Stopped => 3,
        }
    }

    /// Pending states carry a checkpoint and a wait hint.
    pub const fn is_pending(self) -> bool {
        matches!(self, ServiceState::StartPending | ServiceState::StopPending)
    }

    /// Short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            ServiceState::StartPending => "start_pending",
            ServiceState::Running => "running",
            ServiceState::StopPending => "stop_pending",
            ServiceState::Stopped => "stopped",
        }
    }
}

/// Classification of the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    /// The service runs in its own process.
    #[default]
    OwnProcess,
    /// The service shares a process with other services.
    ShareProcess,
}

impl ServiceType {
    /// Raw control-plane value.
    pub const fn raw(self) -> u32 {
        match self {
            ServiceType::OwnProcess => 0x10,
            ServiceType::ShareProcess => 0x20,
        }
    }
}

bitflags! {
    /// Control codes the service is currently willing to accept.
    ///
    /// Derived from the current state: non-empty only while [`ServiceState::Running`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlsAccepted: u32 {
        /// The service can be stopped.
        const STOP     = 0x0000_0001;
        /// The service is notified on system shutdown.
        const SHUTDOWN = 0x0000_0004;
    }
}

impl ControlsAccepted {
    /// Accepted controls for a given state.
    pub const fn for_state(state: ServiceState) -> Self {
        match state {
            ServiceState::Running => Self::STOP.union(Self::SHUTDOWN),
            _ => Self::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ServiceState; 4] = [
        ServiceState::StartPending,
        ServiceState::Running,
        ServiceState::StopPending,
        ServiceState::Stopped,
    ];

    #[test]
    fn raw_values_match_control_plane() {
        assert_eq!(ServiceState::StartPending.raw(), 2);
        assert_eq!(ServiceState::Running.raw(), 4);
        assert_eq!(ServiceState::StopPending.raw(), 3);
        assert_eq!(ServiceState::Stopped.raw(), 1);
        assert_eq!(ServiceType::OwnProcess.raw(), 0x10);
    }

    #[test]
    fn rank_is_lifecycle_order_not_raw_order() {
        assert!(ServiceState::StopPending.raw() < ServiceState::Running.raw());
        assert!(ServiceState::StopPending.rank() > ServiceState::Running.rank());
        for pair in ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn controls_only_while_running() {
        for s in ALL {
            let accepted = ControlsAccepted::for_state(s);
            assert_eq!(!accepted.is_empty(), s == ServiceState::Running, "{s:?}");
        }
        assert_eq!(
            ControlsAccepted::for_state(ServiceState::Running).bits(),
            0x1 | 0x4
        );
    }
}
