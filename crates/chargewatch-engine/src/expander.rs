//! MCP23017 16-bit I/O expander client

use crate::ports::{I2cBus, PortSource};
use chargewatch_errors::{BusError, ChargeWatchError, DeviceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Default 7-bit address (A2..A0 tied low).
pub const MCP23017_ADDRESS: u8 = 0x20;

/// Register addresses with IOCON.BANK = 0.
pub mod registers {
    pub const IODIRA: u8 = 0x00;
    pub const IODIRB: u8 = 0x01;
    pub const IPOLA: u8 = 0x02;
    pub const IPOLB: u8 = 0x03;
    pub const GPPUA: u8 = 0x0C;
    pub const GPPUB: u8 = 0x0D;
    pub const GPIOA: u8 = 0x12;
    pub const GPIOB: u8 = 0x13;
}

/// Raw pin levels from one read, port A in the low byte and port B in the
/// high byte. A 0 bit means the line is pulled low (LED on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSnapshot(u16);

impl PortSnapshot {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn from_ports(port_a: u8, port_b: u8) -> Self {
        Self(((port_b as u16) << 8) | port_a as u16)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn port_a(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn port_b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Level of pin `bit` (0..16); out-of-range bits read high.
    pub const fn level(self, bit: u8) -> bool {
        if bit >= 16 {
            return true;
        }
        (self.0 >> bit) & 1 == 1
    }
}

impl fmt::Display for PortSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

pub struct Mcp23017<B: I2cBus> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> Mcp23017<B> {
    pub fn new(bus: B) -> Self {
        Self::with_address(bus, MCP23017_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn name(&self) -> String {
        format!("MCP23017 at {:#04x}", self.address)
    }

    /// All 16 pins as inputs, no polarity inversion, pull-ups on.
    ///
    /// Each pair is one sequential write: the register pointer advances
    /// from the A register to its B twin.
    pub fn init(&mut self) -> Result<()> {
        let writes: [(&str, [u8; 3]); 3] = [
            ("IODIR", [registers::IODIRA, 0xFF, 0xFF]),
            ("IPOL", [registers::IPOLA, 0x00, 0x00]),
            ("GPPU", [registers::GPPUA, 0xFF, 0xFF]),
        ];
        for (name, bytes) in writes {
            match self.bus.write(self.address, &bytes) {
                Ok(()) => debug!(register = name, "Expander register written"),
                Err(ChargeWatchError::Bus(e)) => {
                    return Err(DeviceError::init_failed(
                        self.name(),
                        format!("{name} write failed: {e}"),
                    )
                    .into());
                }
                Err(e) => return Err(e),
            }
        }
        info!(address = self.address, "Expander configured: 16 inputs with pull-ups");
        Ok(())
    }

    /// One write-then-read of GPIOA/GPIOB.
    pub fn read_port(&mut self) -> Result<PortSnapshot> {
        let bytes = self.bus.write_read(self.address, &[registers::GPIOA], 2)?;
        match bytes.as_slice() {
            [a, b] => Ok(PortSnapshot::from_ports(*a, *b)),
            other => Err(BusError::ByteCountMismatch {
                expected: 2,
                actual: other.len(),
            }
            .into()),
        }
    }
}

impl<B: I2cBus> PortSource for Mcp23017<B> {
    fn read_port(&mut self) -> Result<PortSnapshot> {
        Mcp23017::read_port(self)
    }
}
