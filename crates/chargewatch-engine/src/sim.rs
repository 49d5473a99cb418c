//! Simulated CP2112 bridge with an MCP23017 on its bus.
//!
//! [`SimulatedCp2112`] implements [`HidTransport`] and answers the same
//! reports the real bridge does, so the whole stack above the transport runs
//! unmodified. A [`SimHandle`] drives the pins and injects faults.

use crate::bridge::{BridgeConfig, Cp2112Bridge};
use crate::device::open_charger;
use crate::expander::{MCP23017_ADDRESS, Mcp23017, PortSnapshot, registers};
use crate::ports::{DeviceConnector, PortSource};
use crate::slots::{PinMap, SLOT_COUNT, SlotState};
use chargewatch_errors::{DeviceError, Result};
use chargewatch_hid_common::{
    HidCommonError, HidCommonResult, HidDeviceInfo, HidTransport, Report, check_report_size,
    pad_report,
};
use hid_cp2112_protocol::{CP2112_PRODUCT_ID, CP2112_VENDOR_ID, MAX_READ_CHUNK_LEN, report_ids};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

const REGISTER_COUNT: usize = 0x16;

/// One-shot fault applied to the next I²C transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Nack,
    BusBusy,
    /// Transfer stays busy until cancelled.
    Stall,
    /// Transfer completes one byte short.
    ShortRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Idle,
    Complete { bytes_read: u16 },
    Failed { code: u8, bytes_read: u16 },
    Stalled,
}

#[derive(Debug)]
struct SimState {
    connected: bool,
    expander_address: u8,
    registers: [u8; REGISTER_COUNT],
    /// Levels driven onto the pins from outside; 0 pulls the line low.
    pins: u16,
    pointer: u8,
    transfer: Transfer,
    pending_read: Vec<u8>,
    outbox: VecDeque<Report>,
    faults: VecDeque<Fault>,
    smbus_clock_hz: Option<u32>,
    gpio_config: Option<Vec<u8>>,
    transfer_requests: u32,
    cancels: u32,
    connects: u32,
}

fn power_on_registers() -> [u8; REGISTER_COUNT] {
    let mut regs = [0u8; REGISTER_COUNT];
    regs[registers::IODIRA as usize] = 0xFF;
    regs[registers::IODIRB as usize] = 0xFF;
    regs
}

impl SimState {
    fn new() -> Self {
        Self {
            connected: true,
            expander_address: MCP23017_ADDRESS,
            registers: power_on_registers(),
            pins: 0xFFFF,
            pointer: 0,
            transfer: Transfer::Idle,
            pending_read: Vec::new(),
            outbox: VecDeque::new(),
            faults: VecDeque::new(),
            smbus_clock_hz: None,
            gpio_config: None,
            transfer_requests: 0,
            cancels: 0,
            connects: 0,
        }
    }

    fn reg16(&self, a: u8) -> u16 {
        let lo = self.registers[a as usize] as u16;
        let hi = self.registers[a as usize + 1] as u16;
        (hi << 8) | lo
    }

    /// What GPIOA/GPIOB read back: input pins with pull-ups follow the
    /// driven level, floating inputs read low, polarity applied last.
    fn gpio_value(&self) -> u16 {
        let pullups = self.reg16(registers::GPPUA);
        let polarity = self.reg16(registers::IPOLA);
        (self.pins & pullups) ^ polarity
    }

    fn read_register(&self, reg: u8) -> u8 {
        match reg {
            registers::GPIOA => (self.gpio_value() & 0xFF) as u8,
            registers::GPIOB => (self.gpio_value() >> 8) as u8,
            r => self.registers.get(r as usize).copied().unwrap_or(0),
        }
    }

    fn advance(&mut self) {
        self.pointer = self.pointer.wrapping_add(1) % REGISTER_COUNT as u8;
    }

    fn read_sequential(&mut self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_register(self.pointer));
            self.advance();
        }
        out
    }

    fn write_sequential(&mut self, data: &[u8]) {
        let Some((reg, values)) = data.split_first() else {
            return;
        };
        self.pointer = *reg;
        for value in values {
            if let Some(slot) = self.registers.get_mut(self.pointer as usize) {
                *slot = *value;
            }
            self.advance();
        }
    }

    /// Common preamble of a transfer request. `None` means it already
    /// failed or stalled.
    fn begin(&mut self, address: u8) -> Option<Option<Fault>> {
        self.transfer_requests += 1;
        self.pending_read.clear();
        let fault = self.faults.pop_front();
        let nack = address != self.expander_address || fault == Some(Fault::Nack);
        self.transfer = if nack {
            Transfer::Failed {
                code: 0,
                bytes_read: 0,
            }
        } else if fault == Some(Fault::BusBusy) {
            Transfer::Failed {
                code: 1,
                bytes_read: 0,
            }
        } else if fault == Some(Fault::Stall) {
            Transfer::Stalled
        } else {
            return Some(fault);
        };
        None
    }

    fn finish_read(&mut self, mut data: Vec<u8>, fault: Option<Fault>) {
        if fault == Some(Fault::ShortRead) {
            data.pop();
        }
        self.transfer = Transfer::Complete {
            bytes_read: data.len() as u16,
        };
        self.pending_read = data;
    }

    fn status_report(&self) -> Report {
        let (s0, s1, n) = match self.transfer {
            Transfer::Idle => (0x00, 0x00, 0),
            Transfer::Complete { bytes_read } => (0x02, 0x05, bytes_read),
            Transfer::Failed { code, bytes_read } => (0x03, code, bytes_read),
            Transfer::Stalled => (0x01, 0x00, 0),
        };
        let [hi, lo] = n.to_be_bytes();
        pad_report(&[report_ids::TRANSFER_STATUS_RESPONSE, s0, s1, 0, 0, hi, lo])
    }

    fn handle(&mut self, report: &[u8]) {
        let byte = |i: usize| report.get(i).copied().unwrap_or(0);
        let u16_at = |i: usize| u16::from_be_bytes([byte(i), byte(i + 1)]);

        match byte(0) {
            report_ids::DATA_READ_REQUEST => {
                let len = u16_at(2) as usize;
                if let Some(fault) = self.begin(byte(1) >> 1) {
                    let data = self.read_sequential(len);
                    self.finish_read(data, fault);
                }
            }
            report_ids::DATA_WRITE_READ_REQUEST => {
                let len = u16_at(2) as usize;
                let prefix_len = byte(4) as usize;
                let prefix = report.get(5..5 + prefix_len).unwrap_or(&[]).to_vec();
                if let Some(fault) = self.begin(byte(1) >> 1) {
                    if let Some(reg) = prefix.first() {
                        self.pointer = *reg;
                    }
                    let data = self.read_sequential(len);
                    self.finish_read(data, fault);
                }
            }
            report_ids::DATA_WRITE => {
                let len = byte(2) as usize;
                let data = report.get(3..3 + len).unwrap_or(&[]).to_vec();
                if self.begin(byte(1) >> 1).is_some() {
                    self.write_sequential(&data);
                    self.transfer = Transfer::Complete { bytes_read: 0 };
                }
            }
            report_ids::TRANSFER_STATUS_REQUEST => {
                let status = self.status_report();
                self.outbox.push_back(status);
            }
            report_ids::DATA_READ_FORCE_SEND => {
                let data = std::mem::take(&mut self.pending_read);
                for chunk in data.chunks(MAX_READ_CHUNK_LEN) {
                    let mut raw = vec![report_ids::DATA_READ_RESPONSE, 0x02, chunk.len() as u8];
                    raw.extend_from_slice(chunk);
                    self.outbox.push_back(pad_report(&raw));
                }
            }
            report_ids::CANCEL_TRANSFER => {
                self.cancels += 1;
                self.transfer = Transfer::Idle;
                self.pending_read.clear();
            }
            _ => {}
        }
    }
}

/// Transport end of the simulation.
pub struct SimulatedCp2112 {
    state: Arc<Mutex<SimState>>,
    info: HidDeviceInfo,
}

impl HidTransport for SimulatedCp2112 {
    fn device_info(&self) -> &HidDeviceInfo {
        &self.info
    }

    fn send_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        check_report_size(report)?;
        let mut state = self.state.lock();
        if !state.connected {
            return Err(HidCommonError::Disconnected);
        }
        state.handle(report);
        Ok(())
    }

    fn send_feature_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(HidCommonError::Disconnected);
        }
        match report.first().copied() {
            Some(report_ids::GPIO_CONFIG) => state.gpio_config = Some(report.to_vec()),
            Some(report_ids::SMBUS_CONFIG) => {
                let clock = report
                    .get(1..5)
                    .and_then(|b| <[u8; 4]>::try_from(b).ok())
                    .map(u32::from_be_bytes);
                state.smbus_clock_hz = clock;
            }
            _ => {}
        }
        Ok(())
    }

    fn receive_report(&mut self, timeout: Duration) -> HidCommonResult<Report> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(HidCommonError::Disconnected);
        }
        state.outbox.pop_front().ok_or(HidCommonError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

/// Control side of the simulation. Clones share the same device.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// A fresh transport onto the simulated bridge.
    pub fn transport(&self) -> SimulatedCp2112 {
        SimulatedCp2112 {
            state: Arc::clone(&self.state),
            info: HidDeviceInfo::new(CP2112_VENDOR_ID, CP2112_PRODUCT_ID, "sim://cp2112")
                .with_product_name("Simulated CP2112")
                .with_serial("SIM0001"),
        }
    }

    /// Bridge and expander, configured and initialised.
    pub fn open(&self) -> Result<Mcp23017<Cp2112Bridge<SimulatedCp2112>>> {
        open_charger(self.transport(), BridgeConfig::immediate(), 100_000)
    }

    pub fn connector(&self) -> SimConnector {
        SimConnector {
            handle: self.clone(),
        }
    }

    pub fn set_pins(&self, port: PortSnapshot) {
        self.state.lock().pins = port.raw();
    }

    /// Light the LEDs so `map` decodes to `states`.
    pub fn set_states(&self, map: &PinMap, states: &[SlotState; SLOT_COUNT]) {
        self.set_pins(map.encode(states));
    }

    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.push_back(fault);
    }

    /// Unplug: every transport call fails and the expander loses power.
    pub fn unplug(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.registers = power_on_registers();
        state.outbox.clear();
        state.transfer = Transfer::Idle;
    }

    pub fn plug_in(&self) {
        self.state.lock().connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state.lock().read_register(reg)
    }

    pub fn smbus_clock_hz(&self) -> Option<u32> {
        self.state.lock().smbus_clock_hz
    }

    pub fn gpio_config(&self) -> Option<Vec<u8>> {
        self.state.lock().gpio_config.clone()
    }

    pub fn transfer_requests(&self) -> u32 {
        self.state.lock().transfer_requests
    }

    pub fn cancels(&self) -> u32 {
        self.state.lock().cancels
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().connects
    }
}

/// [`DeviceConnector`] onto the simulation. Fails with NotFound while
/// unplugged.
pub struct SimConnector {
    handle: SimHandle,
}

impl DeviceConnector for SimConnector {
    fn connect(&mut self) -> Result<Box<dyn PortSource>> {
        {
            let mut state = self.handle.state.lock();
            state.connects += 1;
            if !state.connected {
                return Err(DeviceError::not_found("sim://cp2112").into());
            }
        }
        let expander = self.handle.open()?;
        Ok(Box::new(expander))
    }

    fn describe(&self) -> String {
        "simulated CP2112".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::I2cBus;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_open_configures_bridge_and_expander() -> TestResult {
        let sim = SimHandle::new();
        sim.open()?;
        assert_eq!(sim.smbus_clock_hz(), Some(100_000));
        assert_eq!(sim.gpio_config(), Some(vec![0x02, 0x83, 0xFF, 0xFF, 0x01]));
        assert_eq!(sim.register(registers::GPPUA), 0xFF);
        assert_eq!(sim.register(registers::GPPUB), 0xFF);
        assert_eq!(sim.register(registers::IPOLA), 0x00);
        Ok(())
    }

    #[test]
    fn test_floating_inputs_read_low_without_pullups() -> TestResult {
        let sim = SimHandle::new();
        let mut bridge = Cp2112Bridge::new(sim.transport(), BridgeConfig::immediate());
        let data = bridge.write_read(MCP23017_ADDRESS, &[registers::GPIOA], 2)?;
        assert_eq!(data, vec![0x00, 0x00]);
        Ok(())
    }

    #[test]
    fn test_pins_reach_port_snapshot() -> TestResult {
        let sim = SimHandle::new();
        let mut mcp = sim.open()?;
        sim.set_pins(PortSnapshot::new(0xFE3F));
        assert_eq!(mcp.read_port()?.raw(), 0xFE3F);
        Ok(())
    }

    #[test]
    fn test_wrong_address_nacks() {
        let sim = SimHandle::new();
        let mut bridge = Cp2112Bridge::new(sim.transport(), BridgeConfig::immediate());
        assert!(bridge.write(0x21, &[0x00, 0xFF]).is_err());
        assert_eq!(sim.transfer_requests(), 2);
    }

    #[test]
    fn test_stall_is_cancelled() -> TestResult {
        let sim = SimHandle::new();
        let mut mcp = sim.open()?;
        sim.inject(Fault::Stall);
        // First attempt stalls and is cancelled; the retry succeeds.
        mcp.read_port()?;
        assert_eq!(sim.cancels(), 1);
        Ok(())
    }

    #[test]
    fn test_unplug_resets_expander() -> TestResult {
        let sim = SimHandle::new();
        sim.open()?;
        sim.unplug();
        sim.plug_in();
        assert_eq!(sim.register(registers::GPPUA), 0x00);
        Ok(())
    }
}
