//! HID protocol for the Silicon Labs CP2112 USB-to-SMBus/I²C bridge.
//!
//! The CP2112 enumerates as a plain HID device. Configuration is done with
//! feature reports and every I²C transfer is an exchange of 64-byte
//! interrupt reports: the host issues a request, polls the transfer status
//! until the SMBus engine finishes, then forces the read data out.
//!
//! ## Report set
//!
//! | ID | Direction | Name |
//! |------|-------------|---------------------------------|
//! | 0x02 | feature out | Set GPIO Configuration |
//! | 0x06 | feature out | Set SMBus Configuration |
//! | 0x10 | out | Data Read Request |
//! | 0x11 | out | Data Write-Read Request |
//! | 0x12 | out | Data Read Force Send |
//! | 0x13 | in | Data Read Response |
//! | 0x14 | out | Data Write |
//! | 0x15 | out | Transfer Status Request |
//! | 0x16 | in | Transfer Status Response |
//! | 0x17 | out | Cancel Transfer |
//!
//! Multi-byte fields are big-endian. Target addresses go on the wire as the
//! 7-bit address shifted left by one.
//!
//! Source: Silicon Labs AN495, "CP2112 Interface Specification".
//!
//! This crate performs no I/O; see `chargewatch-engine` for the driver.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]

pub mod ids;
pub mod input;
pub mod output;
pub mod types;

pub use ids::*;
pub use input::*;
pub use output::*;
pub use types::*;

use chargewatch_errors::{BusError, ChargeWatchError};
use chargewatch_hid_common::HidCommonError;
use thiserror::Error;

/// Longest payload of a Data Write report.
pub const MAX_WRITE_LEN: usize = 61;
/// Longest register-address prefix of a Data Write-Read report.
pub const MAX_WRITE_READ_PREFIX_LEN: usize = 16;
/// Longest read the SMBus engine accepts in one request.
pub const MAX_READ_LEN: u16 = 512;
/// Longest data chunk carried by one Data Read Response.
pub const MAX_READ_CHUNK_LEN: usize = 61;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Cp2112ProtocolError {
    #[error("I2C address {0:#04x} is outside the 7-bit range")]
    InvalidAddress(u8),

    #[error("Payload length {actual} outside {min}..={max}")]
    InvalidPayloadLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Expected report {expected:#04x}, got {actual:#04x}")]
    UnexpectedReportId { expected: u8, actual: u8 },

    #[error("Unknown transfer status byte {0:#04x}")]
    UnknownStatus(u8),

    #[error("Read response claims {0} bytes")]
    InvalidReadLength(usize),

    #[error("Malformed report: {0}")]
    Malformed(String),
}

pub type Cp2112Result<T> = Result<T, Cp2112ProtocolError>;

impl From<HidCommonError> for Cp2112ProtocolError {
    fn from(e: HidCommonError) -> Self {
        Cp2112ProtocolError::Malformed(e.to_string())
    }
}

impl From<Cp2112ProtocolError> for BusError {
    fn from(e: Cp2112ProtocolError) -> Self {
        BusError::protocol(e.to_string())
    }
}

impl From<Cp2112ProtocolError> for ChargeWatchError {
    fn from(e: Cp2112ProtocolError) -> Self {
        ChargeWatchError::Bus(e.into())
    }
}
