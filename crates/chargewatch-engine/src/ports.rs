//! Ports (traits) separating each hardware layer from the one above it

use crate::expander::PortSnapshot;
use chargewatch_errors::Result;

/// Blocking I²C master. Every call is one complete transaction.
pub trait I2cBus: Send {
    /// Set the bus clock and bring the master into a known state.
    fn configure(&mut self, bus_speed_hz: u32) -> Result<()>;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<()>;

    fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>>;

    /// Write `prefix`, then read `read_len` bytes under a repeated start.
    fn write_read(&mut self, address: u8, prefix: &[u8], read_len: usize) -> Result<Vec<u8>>;
}

/// Anything that can produce a 16-bit pin snapshot.
pub trait PortSource: Send {
    fn read_port(&mut self) -> Result<PortSnapshot>;
}

impl<T: PortSource + ?Sized> PortSource for Box<T> {
    fn read_port(&mut self) -> Result<PortSnapshot> {
        (**self).read_port()
    }
}

/// Opens and initialises the whole device chain (bridge and expander).
pub trait DeviceConnector: Send {
    fn connect(&mut self) -> Result<Box<dyn PortSource>>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}
