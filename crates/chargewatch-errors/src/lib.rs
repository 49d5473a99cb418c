//! Centralized error types for ChargeWatch
//!
//! Every layer of the monitor reports failures through the types in this
//! crate so that the poll loop can decide, from the error alone, whether a
//! cycle should be retried, marked stale, or escalated into a device fault.
//!
//! # Architecture
//!
//! - [`common`]: the top-level [`ChargeWatchError`], severity and category
//! - [`device`]: USB bridge presence, HID I/O and initialisation failures
//! - [`bus`]: I²C transaction outcomes reported by the bridge chip
//!
//! # Propagation policy
//!
//! Bus errors are transient: the driver retries once and the poll loop marks
//! the cycle stale. Device errors mean the handle is gone or unusable and
//! trigger the reconnect path. Neither ever crashes the poll loop.
//!
//! # Example
//!
//! ```
//! use chargewatch_errors::prelude::*;
//!
//! fn check_ack(acked: bool, address: u8) -> Result<()> {
//!     if !acked {
//!         return Err(BusError::nack(address).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_ack(false, 0x20).is_err_and(|e| e.is_retryable()));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bus;
pub mod common;
pub mod device;
pub mod prelude;

pub use bus::BusError;
pub use common::{ChargeWatchError, ErrorCategory, ErrorSeverity};
pub use device::DeviceError;

/// A specialized `Result` type for ChargeWatch operations.
pub type Result<T> = std::result::Result<T, ChargeWatchError>;
