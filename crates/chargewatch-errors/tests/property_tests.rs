//! Property-based tests for error classification.

use chargewatch_errors::prelude::*;
use proptest::prelude::*;

fn any_bus_error() -> impl Strategy<Value = BusError> {
    prop_oneof![
        (0u8..0x80, any::<u64>()).prop_map(|(a, ms)| BusError::timeout(a, ms)),
        (0u8..0x80).prop_map(BusError::nack),
        (0u8..0x80).prop_map(|address| BusError::BusBusy { address }),
        (0usize..512, 0usize..512)
            .prop_map(|(expected, actual)| BusError::ByteCountMismatch { expected, actual }),
        "[a-z ]{0,24}".prop_map(BusError::protocol),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    /// Bus errors never ask for a reconnect, whatever their variant.
    #[test]
    fn prop_bus_errors_stay_on_the_bus(err in any_bus_error()) {
        let wrapped: ChargeWatchError = err.into();
        prop_assert!(!wrapped.requires_reconnect());
        prop_assert_eq!(wrapped.category(), ErrorCategory::Bus);
    }

    /// Anything retryable is at most a warning.
    #[test]
    fn prop_retryable_is_low_severity(err in any_bus_error()) {
        if err.is_retryable() {
            prop_assert!(err.severity() <= ErrorSeverity::Warning);
        }
    }

    /// The target address always appears in NACK messages.
    #[test]
    fn prop_nack_display_names_address(address in 0u8..0x80) {
        let msg = BusError::nack(address).to_string();
        let expected = format!("{address:#04x}");
        prop_assert!(msg.contains(&expected));
    }
}
