//! Prelude module for convenient error handling imports.

pub use crate::{
    Result,
    bus::BusError,
    common::{ChargeWatchError, ErrorCategory, ErrorSeverity},
    device::DeviceError,
};
