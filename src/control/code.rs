//! Control codes delivered by the control plane and the handler's answer.

/// Answer for a control code not handled by this service (`ERROR_CALL_NOT_IMPLEMENTED`).
pub const ERROR_CALL_NOT_IMPLEMENTED: u32 = 120;

/// Control request delivered by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    Stop,
    Interrogate,
    Shutdown,
    /// Any code this crate has no name for.
    Other(u32),
}

impl ControlCode {
    /// Parses a raw control code.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0x1 => ControlCode::Stop,
            0x4 => ControlCode::Interrogate,
            0x5 => ControlCode::Shutdown,
            other => ControlCode::Other(other),
        }
    }

    /// Raw control code.
    pub const fn raw(self) -> u32 {
        match self {
            ControlCode::Stop => 0x1,
            ControlCode::Interrogate => 0x4,
            ControlCode::Shutdown => 0x5,
            ControlCode::Other(raw) => raw,
        }
    }

    /// Stop and Shutdown both end the run.
    pub const fn is_stop(self) -> bool {
        matches!(self, ControlCode::Stop | ControlCode::Shutdown)
    }
}

/// Result returned to the control plane for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResult {
    Handled,
    NotHandled,
}

impl ControlResult {
    /// Raw return value: 0 when handled, non-zero otherwise.
    pub const fn raw(self) -> u32 {
        match self {
            ControlResult::Handled => 0,
            ControlResult::NotHandled => ERROR_CALL_NOT_IMPLEMENTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_and_shutdown_codes() {
        assert_eq!(ControlCode::from_raw(1), ControlCode::Stop);
        assert_eq!(ControlCode::from_raw(5), ControlCode::Shutdown);
        assert!(ControlCode::Stop.is_stop());
        assert!(ControlCode::Shutdown.is_stop());
        assert!(!ControlCode::Interrogate.is_stop());
        assert_eq!(ControlCode::from_raw(0x2), ControlCode::Other(0x2));
        assert_eq!(ControlCode::from_raw(0x80), ControlCode::Other(0x80));
        assert_eq!(ControlCode::Other(0x80).raw(), 0x80);
    }

    #[test]
    fn result_raw_values() {
        assert_eq!(ControlResult::Handled.raw(), 0);
        assert_ne!(ControlResult::NotHandled.raw(), 0);
    }
}
