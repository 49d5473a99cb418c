//! Device and HID transport error types.
//!
//! These describe the USB bridge itself: whether it is present, whether the
//! OS handle still works, and whether the attached expander accepted its
//! configuration.

use crate::common::ErrorSeverity;

/// USB bridge and HID transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// No matching USB bridge is attached
    #[error("Device not found: {0}")]
    NotFound(String),

    /// The bridge went away while open
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// A report of the wrong length was handed to the transport
    #[error("Invalid report size: expected {expected} bytes, got {actual}")]
    InvalidReportSize {
        /// Required report length
        expected: usize,
        /// Length the caller supplied
        actual: usize,
    },

    /// OS-level HID failure
    #[error("HID error: {0}")]
    Hid(String),

    /// The expander (or the bridge) rejected its start-up configuration
    #[error("Failed to initialize device {device}: {reason}")]
    InitializationFailed {
        /// Device identifier
        device: String,
        /// Failure reason
        reason: String,
    },
}

impl DeviceError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeviceError::NotFound(_) => ErrorSeverity::Error,
            DeviceError::Disconnected(_) => ErrorSeverity::Critical,
            DeviceError::InvalidReportSize { .. } => ErrorSeverity::Critical,
            DeviceError::Hid(_) => ErrorSeverity::Error,
            DeviceError::InitializationFailed { .. } => ErrorSeverity::Error,
        }
    }

    /// Check if this error indicates the device handle is unusable.
    ///
    /// `InvalidReportSize` is a programming error, not an availability
    /// problem, so it does not trigger a reconnect.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            DeviceError::NotFound(_) | DeviceError::Disconnected(_) | DeviceError::Hid(_)
        )
    }

    /// Whether this error is fatal at start-up (the daemon refuses to run).
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            DeviceError::NotFound(_) | DeviceError::InitializationFailed { .. }
        )
    }

    /// Create a not found error.
    pub fn not_found(device: impl Into<String>) -> Self {
        DeviceError::NotFound(device.into())
    }

    /// Create a disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        DeviceError::Disconnected(device.into())
    }

    /// Create an initialization error.
    pub fn init_failed(device: impl Into<String>, reason: impl Into<String>) -> Self {
        DeviceError::InitializationFailed {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_severity() {
        assert_eq!(
            DeviceError::disconnected("cp2112").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            DeviceError::not_found("cp2112").severity(),
            ErrorSeverity::Error
        );
    }

    #[test]
    fn test_device_error_is_device_unavailable() {
        assert!(DeviceError::not_found("cp2112").is_device_unavailable());
        assert!(DeviceError::disconnected("cp2112").is_device_unavailable());
        assert!(DeviceError::Hid("EPIPE".into()).is_device_unavailable());
        assert!(
            !DeviceError::InvalidReportSize {
                expected: 64,
                actual: 3
            }
            .is_device_unavailable()
        );
    }

    #[test]
    fn test_fatal_at_startup() {
        assert!(DeviceError::not_found("cp2112").is_fatal_at_startup());
        assert!(DeviceError::init_failed("mcp23017", "no ack").is_fatal_at_startup());
        assert!(!DeviceError::disconnected("cp2112").is_fatal_at_startup());
    }

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::InvalidReportSize {
            expected: 64,
            actual: 65,
        };
        let msg = err.to_string();
        assert!(msg.contains("64"));
        assert!(msg.contains("65"));
    }
}
