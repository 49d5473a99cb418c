//! I²C transaction outcomes.
//!
//! One variant per way an I2CTransaction can fail as reported by the bridge's
//! transfer-status report. Addresses are 7-bit.

use crate::common::ErrorSeverity;

/// I²C bus errors surfaced by the bridge driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The bridge never reported completion within the poll budget
    #[error("I2C transfer to {address:#04x} timed out after {elapsed_ms}ms")]
    Timeout {
        /// Target address
        address: u8,
        /// Time spent polling
        elapsed_ms: u64,
    },

    /// The target did not acknowledge its address
    #[error("I2C target {address:#04x} did not acknowledge")]
    Nack {
        /// Target address
        address: u8,
    },

    /// The bus was held by another master or arbitration was lost
    #[error("I2C bus busy while addressing {address:#04x}")]
    BusBusy {
        /// Target address
        address: u8,
    },

    /// Fewer or more bytes moved than requested
    #[error("I2C byte count mismatch: expected {expected}, got {actual}")]
    ByteCountMismatch {
        /// Requested length
        expected: usize,
        /// Transferred length
        actual: usize,
    },

    /// The bridge answered with something the driver cannot interpret
    #[error("Bridge protocol error: {0}")]
    Protocol(String),
}

impl BusError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BusError::Timeout { .. } => ErrorSeverity::Warning,
            BusError::Nack { .. } => ErrorSeverity::Warning,
            BusError::BusBusy { .. } => ErrorSeverity::Warning,
            BusError::ByteCountMismatch { .. } => ErrorSeverity::Error,
            BusError::Protocol(_) => ErrorSeverity::Error,
        }
    }

    /// Timeouts and NACKs get one automatic retry; contention and
    /// malformed replies point at wiring faults and are surfaced directly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Timeout { .. } | BusError::Nack { .. })
    }

    /// Create a timeout error.
    pub fn timeout(address: u8, elapsed_ms: u64) -> Self {
        BusError::Timeout {
            address,
            elapsed_ms,
        }
    }

    /// Create a NACK error.
    pub fn nack(address: u8) -> Self {
        BusError::Nack { address }
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        BusError::Protocol(msg.into())
    }
}
