//! Top-level error type and classification shared by all ChargeWatch crates.

use core::fmt;

use crate::{BusError, DeviceError};

/// Top-level error type wrapping every ChargeWatch sub-error.
#[derive(Debug, thiserror::Error)]
pub enum ChargeWatchError {
    /// USB bridge and HID errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// I²C bus transaction errors
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChargeWatchError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChargeWatchError::Device(_) => ErrorCategory::Device,
            ChargeWatchError::Bus(_) => ErrorCategory::Bus,
            ChargeWatchError::Io(_) => ErrorCategory::IO,
            ChargeWatchError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ChargeWatchError::Device(e) => e.severity(),
            ChargeWatchError::Bus(e) => e.severity(),
            ChargeWatchError::Io(_) => ErrorSeverity::Error,
            ChargeWatchError::Config(_) => ErrorSeverity::Error,
        }
    }

    /// Whether the driver should repeat the transaction once before
    /// surfacing the error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChargeWatchError::Bus(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the bridge handle is gone and a reconnect is required.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            ChargeWatchError::Device(e) => e.is_device_unavailable(),
            ChargeWatchError::Io(_) => true,
            _ => false,
        }
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        ChargeWatchError::Config(msg.into())
    }
}

impl From<std::io::Error> for ChargeWatchError {
    fn from(e: std::io::Error) -> Self {
        ChargeWatchError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// USB bridge and HID errors
    Device = 1,
    /// I²C bus errors
    Bus = 2,
    /// Configuration errors
    Config = 3,
    /// I/O errors
    IO = 4,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Bus => write!(f, "Bus"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, the current cycle is degraded
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the device is unusable until reconnected
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
