//! Value types shared by the encoders and decoders

use crate::{Cp2112ProtocolError, Cp2112Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 7-bit I²C target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct I2cAddress(u8);

impl I2cAddress {
    pub fn new(address: u8) -> Cp2112Result<Self> {
        if address > 0x7F {
            return Err(Cp2112ProtocolError::InvalidAddress(address));
        }
        Ok(Self(address))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Address as the bridge expects it: shifted into bits 7..1.
    pub fn wire(self) -> u8 {
        self.0 << 1
    }
}

impl fmt::Display for I2cAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl TryFrom<u8> for I2cAddress {
    type Error = Cp2112ProtocolError;

    fn try_from(value: u8) -> Cp2112Result<Self> {
        Self::new(value)
    }
}

/// Contents of the Set SMBus Configuration feature report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmbusConfig {
    pub clock_hz: u32,
    /// The bridge's own address; only matters if it were a target.
    pub own_address: u8,
    /// Push read data automatically instead of waiting for Force Send.
    pub auto_send_read: bool,
    pub write_timeout_ms: u16,
    pub read_timeout_ms: u16,
    pub scl_low_timeout: bool,
    /// Address-NACK retries done by the chip itself; 0 means unlimited.
    pub retry_limit: u16,
}

impl SmbusConfig {
    pub fn with_clock(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }
}

impl Default for SmbusConfig {
    fn default() -> Self {
        Self {
            clock_hz: 100_000,
            own_address: 0x02,
            auto_send_read: false,
            write_timeout_ms: 50,
            read_timeout_ms: 50,
            scl_low_timeout: true,
            retry_limit: 1,
        }
    }
}

/// Contents of the Set GPIO Configuration feature report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioConfig {
    pub direction: u8,
    pub push_pull: u8,
    pub special: u8,
    pub clock_divider: u8,
}

impl GpioConfig {
    /// GPIO.0/GPIO.1 drive the TX/RX activity LEDs, everything else plain.
    pub fn activity_leds() -> Self {
        Self {
            direction: 0x83,
            push_pull: 0xFF,
            special: 0xFF,
            clock_divider: 1,
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self::activity_leds()
    }
}

/// Why the SMBus engine gave up on a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferError {
    AddressNack,
    BusNotFree,
    ArbitrationLost,
    ReadIncomplete,
    WriteIncomplete,
    Other(u8),
}

impl TransferError {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::AddressNack,
            1 => Self::BusNotFree,
            2 => Self::ArbitrationLost,
            3 => Self::ReadIncomplete,
            4 => Self::WriteIncomplete,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::AddressNack => 0,
            Self::BusNotFree => 1,
            Self::ArbitrationLost => 2,
            Self::ReadIncomplete => 3,
            Self::WriteIncomplete => 4,
            Self::Other(code) => code,
        }
    }
}

/// First status byte of a transfer status or read response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Idle,
    Busy,
    Complete,
    Error(TransferError),
}

impl TransferStatus {
    pub fn from_bytes(status0: u8, status1: u8) -> Cp2112Result<Self> {
        match status0 {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Busy),
            2 => Ok(Self::Complete),
            3 => Ok(Self::Error(TransferError::from_code(status1))),
            other => Err(Cp2112ProtocolError::UnknownStatus(other)),
        }
    }
}
