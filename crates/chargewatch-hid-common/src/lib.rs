//! Fixed-size HID report transport for the USB-to-I²C bridge
//!
//! This crate owns the lowest layer of the monitor: opening the bridge as a
//! HID device and moving whole reports across it. Everything above (the
//! bridge command set, the expander registers) is expressed in terms of the
//! [`HidTransport`] trait so it can run against the [`mock`] transport in
//! tests.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod device_info;
pub mod hid_traits;
pub mod hidapi_transport;
pub mod report_parser;

pub use device_info::*;
pub use hid_traits::*;
pub use hidapi_transport::HidApiTransport;
pub use report_parser::*;

use chargewatch_errors::{ChargeWatchError, DeviceError};
use thiserror::Error;

/// Size of every interrupt report exchanged with the bridge, report ID
/// included. Full-speed HID caps interrupt transfers at 64 bytes.
pub const HID_REPORT_SIZE: usize = 64;

/// One interrupt report, report ID in byte 0.
pub type Report = [u8; HID_REPORT_SIZE];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HidCommonError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("Invalid report size: expected {expected}, got {actual}")]
    InvalidReportSize { expected: usize, actual: usize },

    #[error("No report received within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Device disconnected")]
    Disconnected,
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;

impl From<HidCommonError> for DeviceError {
    fn from(e: HidCommonError) -> Self {
        match e {
            HidCommonError::DeviceNotFound(what) => DeviceError::NotFound(what),
            HidCommonError::Disconnected => DeviceError::disconnected("usb bridge"),
            HidCommonError::InvalidReportSize { expected, actual } => {
                DeviceError::InvalidReportSize { expected, actual }
            }
            other => DeviceError::Hid(other.to_string()),
        }
    }
}

impl From<HidCommonError> for ChargeWatchError {
    fn from(e: HidCommonError) -> Self {
        ChargeWatchError::Device(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = HidCommonError::DeviceNotFound("10c4:ea90".to_string());
        assert_eq!(err.to_string(), "Device not found: 10c4:ea90");

        let err = HidCommonError::Disconnected;
        assert_eq!(err.to_string(), "Device disconnected");
    }

    #[test]
    fn test_conversion_keeps_report_size() {
        let err: DeviceError = HidCommonError::InvalidReportSize {
            expected: 64,
            actual: 5,
        }
        .into();
        assert_eq!(
            err,
            DeviceError::InvalidReportSize {
                expected: 64,
                actual: 5
            }
        );
    }

    #[test]
    fn test_io_failures_require_reconnect() {
        let err: ChargeWatchError = HidCommonError::WriteError("EPIPE".into()).into();
        assert!(err.requires_reconnect());

        let err: ChargeWatchError = HidCommonError::Disconnected.into();
        assert!(err.requires_reconnect());
    }
}
