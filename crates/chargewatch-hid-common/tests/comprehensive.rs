//! Transport-level behaviour against the mock device.

use chargewatch_hid_common::mock::MockHidTransport;
use chargewatch_hid_common::*;
use proptest::prelude::*;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn given_boxed_transport_when_sending_then_mock_sees_report() -> TestResult {
    let mock = MockHidTransport::new(0x10C4, 0xEA90, "mock");
    let mut boxed: Box<dyn HidTransport> = Box::new(mock.clone());

    let mut builder = ReportBuilder::interrupt(0x15);
    builder.write_u8(0x01)?;
    boxed.send_report(&builder.into_report()?)?;

    assert_eq!(mock.write_history().len(), 1);
    assert_eq!(boxed.device_info().vendor_id, 0x10C4);
    Ok(())
}

#[test]
fn given_queued_reports_when_receiving_then_fifo_order() -> TestResult {
    let mut mock = MockHidTransport::new(0x10C4, 0xEA90, "mock");
    mock.queue_read(&[0x16, 0x01]);
    mock.queue_read(&[0x16, 0x02]);

    let first = mock.receive_report(Duration::from_millis(1))?;
    let second = mock.receive_report(Duration::from_millis(1))?;
    assert_eq!(first[1], 0x01);
    assert_eq!(second[1], 0x02);
    assert_eq!(mock.pending_reads(), 0);
    Ok(())
}

#[test]
fn given_device_info_when_serialized_then_round_trips() -> TestResult {
    let info = HidDeviceInfo::new(0x10C4, 0xEA90, "/dev/hidraw3").with_serial("00A1");
    let json = serde_json::to_string(&info)?;
    let back: HidDeviceInfo = serde_json::from_str(&json)?;
    assert_eq!(back, info);
    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    /// The parser never panics, whatever bytes it is given.
    #[test]
    fn prop_parser_is_total(data in proptest::collection::vec(any::<u8>(), 0..80), take in 0usize..100) {
        let mut parser = ReportParser::new(&data);
        let _ = parser.read_u8();
        let _ = parser.read_u16_be();
        let _ = parser.read_bytes(take);
        prop_assert!(parser.remaining() <= data.len());
    }

    /// Only exactly-sized reports reach the device.
    #[test]
    fn prop_send_report_enforces_size(len in 0usize..130) {
        let mut mock = MockHidTransport::new(0x10C4, 0xEA90, "mock");
        let data = vec![0x14u8; len];
        let result = mock.send_report(&data);
        prop_assert_eq!(result.is_ok(), len == HID_REPORT_SIZE);
        prop_assert_eq!(mock.write_history().len(), usize::from(len == HID_REPORT_SIZE));
    }
}
