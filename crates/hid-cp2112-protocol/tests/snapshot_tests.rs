//! Snapshot tests for the CP2112 wire format.
//!
//! These lock in the exact bytes so an accidental layout change is caught.

use hid_cp2112_protocol::*;
use insta::assert_snapshot;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_snapshot_smbus_config_default() -> TestResult {
    let report = encode_smbus_config(&SmbusConfig::default())?;
    assert_snapshot!(hex(&report), @"06 00 01 86 a0 02 00 00 32 00 32 01 00 01");
    Ok(())
}

#[test]
fn test_snapshot_smbus_config_fast_mode() -> TestResult {
    let report = encode_smbus_config(&SmbusConfig::default().with_clock(400_000))?;
    assert_snapshot!(hex(&report), @"06 00 06 1a 80 02 00 00 32 00 32 01 00 01");
    Ok(())
}

#[test]
fn test_snapshot_gpio_config() -> TestResult {
    let report = encode_gpio_config(&GpioConfig::activity_leds())?;
    assert_snapshot!(hex(&report), @"02 83 ff ff 01");
    Ok(())
}

#[test]
fn test_snapshot_expander_direction_write() -> TestResult {
    let report = encode_write(I2cAddress::new(0x20)?, &[0x00, 0xFF, 0xFF])?;
    assert_snapshot!(hex(&report[..8]), @"14 40 03 00 ff ff 00 00");
    Ok(())
}

#[test]
fn test_snapshot_port_read_request() -> TestResult {
    let report = encode_write_read_request(I2cAddress::new(0x20)?, &[0x12], 2)?;
    assert_snapshot!(hex(&report[..8]), @"11 40 00 02 01 12 00 00");
    Ok(())
}

#[test]
fn test_snapshot_force_send() -> TestResult {
    let report = encode_read_force_send(2)?;
    assert_snapshot!(hex(&report[..4]), @"12 00 02 00");
    Ok(())
}
