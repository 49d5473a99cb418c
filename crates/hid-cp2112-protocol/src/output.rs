//! Host-to-bridge report encoders
//!
//! Interrupt requests come back as full 64-byte [`Report`]s; feature reports
//! are returned at their fixed per-ID length.

use crate::ids::{feature_lengths, report_ids};
use crate::{
    Cp2112ProtocolError, Cp2112Result, GpioConfig, I2cAddress, MAX_READ_LEN,
    MAX_WRITE_LEN, MAX_WRITE_READ_PREFIX_LEN, SmbusConfig,
};
use chargewatch_hid_common::{Report, ReportBuilder};

fn check_len(actual: usize, min: usize, max: usize) -> Cp2112Result<()> {
    if actual < min || actual > max {
        return Err(Cp2112ProtocolError::InvalidPayloadLength { min, max, actual });
    }
    Ok(())
}

fn check_read_len(len: u16) -> Cp2112Result<()> {
    check_len(len as usize, 1, MAX_READ_LEN as usize)
}

pub fn encode_gpio_config(config: &GpioConfig) -> Cp2112Result<Vec<u8>> {
    let mut b = ReportBuilder::new(report_ids::GPIO_CONFIG, feature_lengths::GPIO_CONFIG);
    b.write_u8(config.direction)?
        .write_u8(config.push_pull)?
        .write_u8(config.special)?
        .write_u8(config.clock_divider)?;
    Ok(b.into_inner())
}

pub fn encode_smbus_config(config: &SmbusConfig) -> Cp2112Result<Vec<u8>> {
    let mut b = ReportBuilder::new(report_ids::SMBUS_CONFIG, feature_lengths::SMBUS_CONFIG);
    b.write_u32_be(config.clock_hz)?
        .write_u8(config.own_address)?
        .write_u8(u8::from(config.auto_send_read))?
        .write_u16_be(config.write_timeout_ms)?
        .write_u16_be(config.read_timeout_ms)?
        .write_u8(u8::from(config.scl_low_timeout))?
        .write_u16_be(config.retry_limit)?;
    Ok(b.into_inner())
}

pub fn encode_read_request(address: I2cAddress, len: u16) -> Cp2112Result<Report> {
    check_read_len(len)?;
    let mut b = ReportBuilder::interrupt(report_ids::DATA_READ_REQUEST);
    b.write_u8(address.wire())?.write_u16_be(len)?;
    Ok(b.into_report()?)
}

/// Write `prefix` (typically a register address) then read `read_len` bytes
/// under a repeated start.
pub fn encode_write_read_request(
    address: I2cAddress,
    prefix: &[u8],
    read_len: u16,
) -> Cp2112Result<Report> {
    check_len(prefix.len(), 1, MAX_WRITE_READ_PREFIX_LEN)?;
    check_read_len(read_len)?;
    let mut b = ReportBuilder::interrupt(report_ids::DATA_WRITE_READ_REQUEST);
    b.write_u8(address.wire())?
        .write_u16_be(read_len)?
        .write_u8(prefix.len() as u8)?
        .write_bytes(prefix)?;
    Ok(b.into_report()?)
}

pub fn encode_read_force_send(len: u16) -> Cp2112Result<Report> {
    check_read_len(len)?;
    let mut b = ReportBuilder::interrupt(report_ids::DATA_READ_FORCE_SEND);
    b.write_u16_be(len)?;
    Ok(b.into_report()?)
}

pub fn encode_write(address: I2cAddress, data: &[u8]) -> Cp2112Result<Report> {
    check_len(data.len(), 1, MAX_WRITE_LEN)?;
    let mut b = ReportBuilder::interrupt(report_ids::DATA_WRITE);
    b.write_u8(address.wire())?
        .write_u8(data.len() as u8)?
        .write_bytes(data)?;
    Ok(b.into_report()?)
}

pub fn encode_transfer_status_request() -> Cp2112Result<Report> {
    let mut b = ReportBuilder::interrupt(report_ids::TRANSFER_STATUS_REQUEST);
    b.write_u8(0x01)?;
    Ok(b.into_report()?)
}

pub fn encode_cancel_transfer() -> Cp2112Result<Report> {
    let mut b = ReportBuilder::interrupt(report_ids::CANCEL_TRANSFER);
    b.write_u8(0x01)?;
    Ok(b.into_report()?)
}
