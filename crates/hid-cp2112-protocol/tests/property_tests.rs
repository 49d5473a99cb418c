//! Property-based tests for the CP2112 wire format.

use chargewatch_hid_common::{HID_REPORT_SIZE, pad_report};
use hid_cp2112_protocol::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    /// Decoders never panic on arbitrary input.
    #[test]
    fn prop_decoders_are_total(data in proptest::collection::vec(any::<u8>(), 0..HID_REPORT_SIZE)) {
        let _ = TransferStatusResponse::parse(&data);
        let _ = DataReadResponse::parse(&data);
    }

    /// Every valid address encodes to its wire form in byte 1.
    #[test]
    fn prop_write_carries_address_and_length(
        address in 0u8..0x80,
        data in proptest::collection::vec(any::<u8>(), 1..=MAX_WRITE_LEN),
    ) {
        let addr = I2cAddress::new(address).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let report = encode_write(addr, &data).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(report[0], report_ids::DATA_WRITE);
        prop_assert_eq!(report[1], address << 1);
        prop_assert_eq!(report[2] as usize, data.len());
        prop_assert_eq!(&report[3..3 + data.len()], &data[..]);
        prop_assert!(report[3 + data.len()..].iter().all(|b| *b == 0));
    }

    /// Addresses above 0x7F are refused.
    #[test]
    fn prop_eight_bit_addresses_rejected(address in 0x80u8..=0xFF) {
        prop_assert!(I2cAddress::new(address).is_err());
    }

    /// Read responses decode back the bytes they carry.
    #[test]
    fn prop_read_response_carries_data(data in proptest::collection::vec(any::<u8>(), 0..=MAX_READ_CHUNK_LEN)) {
        let mut raw = vec![report_ids::DATA_READ_RESPONSE, 0x02, data.len() as u8];
        raw.extend_from_slice(&data);
        let resp = DataReadResponse::parse(&pad_report(&raw))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(resp.data(), &data[..]);
    }

    /// Status byte 0..=3 always decodes; anything else is rejected.
    #[test]
    fn prop_status_byte_domain(status0 in any::<u8>(), status1 in any::<u8>()) {
        let decoded = TransferStatus::from_bytes(status0, status1);
        prop_assert_eq!(decoded.is_ok(), status0 <= 3);
    }
}
