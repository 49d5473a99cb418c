//! CP2112 I²C master driver
//!
//! Each transaction is request, status polling, then (for reads) a forced
//! send of the data. Polling is bounded by [`BridgeConfig::max_status_polls`]
//! and by [`BridgeConfig::transaction_timeout`], so a stuck bridge turns into
//! [`BusError::Timeout`] instead of a hang.

use crate::ports::I2cBus;
use chargewatch_errors::{BusError, ChargeWatchError, Result};
use chargewatch_hid_common::{HidCommonError, HidTransport, Report};
use hid_cp2112_protocol::{
    DataReadResponse, GpioConfig, I2cAddress, SmbusConfig, TransferError, TransferStatus,
    TransferStatusResponse, encode_cancel_transfer, encode_gpio_config, encode_read_force_send,
    encode_read_request, encode_smbus_config, encode_transfer_status_request, encode_write,
    encode_write_read_request, report_id, report_ids,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Pause between transfer status requests.
    pub status_poll_interval: Duration,
    /// Status requests per transaction before giving up.
    pub max_status_polls: u32,
    /// How long one interrupt read may block. Never longer than what is
    /// left of `transaction_timeout`.
    pub receive_timeout: Duration,
    /// Wall-clock budget for one attempt, status polling and data included.
    pub transaction_timeout: Duration,
    /// Repeat a transaction once after a timeout or NACK.
    pub retry_once: bool,
    pub gpio: GpioConfig,
    pub smbus: SmbusConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            status_poll_interval: Duration::from_millis(5),
            max_status_polls: 10,
            receive_timeout: Duration::from_millis(20),
            transaction_timeout: Duration::from_millis(50),
            retry_once: true,
            gpio: GpioConfig::activity_leds(),
            smbus: SmbusConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Configuration for scripted or simulated transports: no waiting.
    pub fn immediate() -> Self {
        Self {
            status_poll_interval: Duration::ZERO,
            receive_timeout: Duration::ZERO,
            transaction_timeout: Duration::from_secs(1),
            ..Self::default()
        }
    }
}

fn transfer_error(address: u8, err: TransferError, expected: usize, actual: u16) -> BusError {
    match err {
        TransferError::AddressNack => BusError::nack(address),
        TransferError::BusNotFree | TransferError::ArbitrationLost => BusError::BusBusy { address },
        TransferError::ReadIncomplete | TransferError::WriteIncomplete => {
            BusError::ByteCountMismatch {
                expected,
                actual: actual as usize,
            }
        }
        TransferError::Other(code) => {
            BusError::protocol(format!("transfer failed with status {code:#04x}"))
        }
    }
}

fn read_len_u16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|e| BusError::protocol(format!("read length {len}: {e}")).into())
}

pub struct Cp2112Bridge<T: HidTransport> {
    transport: T,
    config: BridgeConfig,
}

impl<T: HidTransport> Cp2112Bridge<T> {
    pub fn new(transport: T, config: BridgeConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn send(&mut self, report: Report) -> Result<()> {
        match self.transport.send_report(&report) {
            Ok(()) => Ok(()),
            Err(e @ HidCommonError::InvalidReportSize { .. }) => {
                error!(error = %e, "Bridge report has the wrong size");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn deadline(&self, started: Instant) -> Instant {
        started
            .checked_add(self.config.transaction_timeout)
            .unwrap_or(started)
    }

    /// `None` when nothing arrived in time.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Report>> {
        match self.transport.receive_report(timeout) {
            Ok(report) => Ok(Some(report)),
            Err(HidCommonError::Timeout { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn receive_until(&mut self, deadline: Instant) -> Result<Option<Report>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.receive(self.config.receive_timeout.min(remaining))
    }

    /// Pause before the next poll. `false` once the deadline has passed.
    fn pause_until(&self, deadline: Instant) -> bool {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        let pause = self.config.status_poll_interval.min(remaining);
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        true
    }

    /// Throw away IN reports left over from an abandoned transfer so they
    /// are not taken for the replies to the next request.
    fn discard_pending(&mut self) -> Result<()> {
        let mut discarded = 0u32;
        for _ in 0..self.config.max_status_polls {
            match self.receive(Duration::ZERO)? {
                Some(_) => discarded += 1,
                None => break,
            }
        }
        if discarded > 0 {
            debug!(discarded, "Discarded stale bridge reports");
        }
        Ok(())
    }

    fn wait_complete(
        &mut self,
        address: u8,
        expected: usize,
        started: Instant,
    ) -> Result<TransferStatusResponse> {
        let deadline = self.deadline(started);
        for attempt in 0..self.config.max_status_polls {
            if attempt > 0 && !self.pause_until(deadline) {
                break;
            }
            self.send(encode_transfer_status_request()?)?;
            let Some(report) = self.receive_until(deadline)? else {
                continue;
            };
            if report_id(&report) != Some(report_ids::TRANSFER_STATUS_RESPONSE) {
                debug!(report_id = report[0], "Skipping unrelated report while polling");
                continue;
            }
            let status = TransferStatusResponse::parse(&report)?;
            match status.status {
                TransferStatus::Idle | TransferStatus::Busy => continue,
                TransferStatus::Complete => return Ok(status),
                TransferStatus::Error(err) => {
                    return Err(transfer_error(address, err, expected, status.bytes_read).into());
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(address, elapsed_ms, "Transfer never completed, cancelling");
        self.send(encode_cancel_transfer()?)?;
        self.discard_pending()?;
        Err(BusError::timeout(address, elapsed_ms).into())
    }

    fn collect_read(&mut self, address: u8, len: usize, started: Instant) -> Result<Vec<u8>> {
        self.send(encode_read_force_send(read_len_u16(len)?)?)?;

        let deadline = self.deadline(started);
        let mut data = Vec::with_capacity(len);
        for attempt in 0..self.config.max_status_polls {
            if data.len() >= len {
                break;
            }
            if attempt > 0 && Instant::now() >= deadline {
                break;
            }
            let Some(report) = self.receive_until(deadline)? else {
                continue;
            };
            if report_id(&report) != Some(report_ids::DATA_READ_RESPONSE) {
                continue;
            }
            let resp = DataReadResponse::parse(&report)?;
            if let TransferStatus::Error(err) = resp.status {
                return Err(transfer_error(address, err, len, data.len() as u16).into());
            }
            data.extend_from_slice(resp.data());
        }

        if data.len() != len {
            self.discard_pending()?;
            return Err(BusError::ByteCountMismatch {
                expected: len,
                actual: data.len(),
            }
            .into());
        }
        Ok(data)
    }

    fn transfer_write(&mut self, address: I2cAddress, data: &[u8]) -> Result<()> {
        let started = Instant::now();
        self.send(encode_write(address, data)?)?;
        self.wait_complete(address.value(), data.len(), started)?;
        debug!(address = address.value(), len = data.len(), "I2C write complete");
        Ok(())
    }

    fn transfer_read(&mut self, address: I2cAddress, len: usize) -> Result<Vec<u8>> {
        let started = Instant::now();
        self.send(encode_read_request(address, read_len_u16(len)?)?)?;
        self.finish_read(address, len, started)
    }

    fn transfer_write_read(
        &mut self,
        address: I2cAddress,
        prefix: &[u8],
        len: usize,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();
        self.send(encode_write_read_request(address, prefix, read_len_u16(len)?)?)?;
        self.finish_read(address, len, started)
    }

    fn finish_read(&mut self, address: I2cAddress, len: usize, started: Instant) -> Result<Vec<u8>> {
        let status = self.wait_complete(address.value(), len, started)?;
        if status.bytes_read as usize != len {
            return Err(BusError::ByteCountMismatch {
                expected: len,
                actual: status.bytes_read as usize,
            }
            .into());
        }
        let data = self.collect_read(address.value(), len, started)?;
        debug!(address = address.value(), len, "I2C read complete");
        Ok(data)
    }

    fn with_retry<R>(
        &mut self,
        op: &'static str,
        address: u8,
        mut f: impl FnMut(&mut Self) -> Result<R>,
    ) -> Result<R> {
        match f(self) {
            Err(ChargeWatchError::Bus(e)) if self.config.retry_once && e.is_retryable() => {
                warn!(op, address, error = %e, "I2C transaction failed, retrying once");
                f(self)
            }
            other => other,
        }
    }
}

impl<T: HidTransport> I2cBus for Cp2112Bridge<T> {
    fn configure(&mut self, bus_speed_hz: u32) -> Result<()> {
        if bus_speed_hz == 0 {
            return Err(ChargeWatchError::config("bus speed must be non-zero"));
        }
        let gpio = encode_gpio_config(&self.config.gpio)?;
        self.transport.send_feature_report(&gpio)?;

        self.config.smbus = self.config.smbus.with_clock(bus_speed_hz);
        let smbus = encode_smbus_config(&self.config.smbus)?;
        self.transport.send_feature_report(&smbus)?;

        info!(
            device = %self.transport.device_info().display_name(),
            bus_speed_hz,
            "Configured CP2112 SMBus engine"
        );
        Ok(())
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<()> {
        let addr = I2cAddress::new(address)?;
        self.with_retry("write", address, |bridge| bridge.transfer_write(addr, data))
    }

    fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>> {
        let addr = I2cAddress::new(address)?;
        self.with_retry("read", address, |bridge| bridge.transfer_read(addr, len))
    }

    fn write_read(&mut self, address: u8, prefix: &[u8], read_len: usize) -> Result<Vec<u8>> {
        let addr = I2cAddress::new(address)?;
        self.with_retry("write_read", address, |bridge| {
            bridge.transfer_write_read(addr, prefix, read_len)
        })
    }
}
