//! [`HidTransport`] backed by the `hidapi` crate.

use crate::{
    HID_REPORT_SIZE, HidCommonError, HidCommonResult, HidDeviceInfo, HidTransport, Report,
    check_report_size,
};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::time::Duration;
use tracing::{debug, info};

fn info_from_hidapi(dev: &DeviceInfo) -> HidDeviceInfo {
    HidDeviceInfo {
        vendor_id: dev.vendor_id(),
        product_id: dev.product_id(),
        serial_number: dev.serial_number().map(str::to_string),
        manufacturer: dev.manufacturer_string().map(str::to_string),
        product_name: dev.product_string().map(str::to_string),
        path: dev.path().to_string_lossy().into_owned(),
    }
}

pub struct HidApiTransport {
    device: HidDevice,
    info: HidDeviceInfo,
}

/// Error text for a failed open: what was asked for and, when a serial
/// filter excluded them, which bridges were attached.
fn not_found_message(
    vendor_id: u16,
    product_id: u16,
    serial: Option<&str>,
    attached: &[HidDeviceInfo],
) -> String {
    let wanted = match serial {
        Some(s) => format!("{vendor_id:04x}:{product_id:04x} serial {s}"),
        None => format!("{vendor_id:04x}:{product_id:04x}"),
    };
    if attached.is_empty() {
        return wanted;
    }
    let seen = attached
        .iter()
        .map(|d| d.serial_number.as_deref().unwrap_or("<no serial>"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{wanted} (attached: {seen})")
}

impl HidApiTransport {
    /// Open the first device matching the IDs and, if given, the serial.
    pub fn open(vendor_id: u16, product_id: u16, serial: Option<&str>) -> HidCommonResult<Self> {
        let api = HidApi::new().map_err(|e| HidCommonError::OpenError(e.to_string()))?;

        let candidates: Vec<&DeviceInfo> = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .collect();
        let found = candidates
            .iter()
            .copied()
            .find(|d| info_from_hidapi(d).matches_serial(serial));

        let Some(dev) = found else {
            let attached: Vec<HidDeviceInfo> =
                candidates.iter().copied().map(info_from_hidapi).collect();
            return Err(HidCommonError::DeviceNotFound(not_found_message(
                vendor_id, product_id, serial, &attached,
            )));
        };

        let info = info_from_hidapi(dev);
        let device = dev
            .open_device(&api)
            .map_err(|e| HidCommonError::OpenError(e.to_string()))?;
        device
            .set_blocking_mode(true)
            .map_err(|e| HidCommonError::OpenError(e.to_string()))?;

        info!(device = %info.display_name(), path = %info.path, "Opened HID bridge");
        Ok(Self { device, info })
    }
}

impl HidTransport for HidApiTransport {
    fn device_info(&self) -> &HidDeviceInfo {
        &self.info
    }

    fn send_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        check_report_size(report)?;
        let written = self
            .device
            .write(report)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))?;
        if written != HID_REPORT_SIZE {
            debug!(written, "Short interrupt write");
            return Err(HidCommonError::WriteError(format!(
                "short write: {written} of {HID_REPORT_SIZE} bytes"
            )));
        }
        Ok(())
    }

    fn send_feature_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        self.device
            .send_feature_report(report)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))
    }

    fn receive_report(&mut self, timeout: Duration) -> HidCommonResult<Report> {
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut report = [0u8; HID_REPORT_SIZE];
        let n = self
            .device
            .read_timeout(&mut report, timeout_ms)
            .map_err(|e| HidCommonError::ReadError(e.to_string()))?;
        if n == 0 {
            return Err(HidCommonError::Timeout {
                timeout_ms: timeout_ms as u64,
            });
        }
        // Short reads leave the zero padding in place.
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_without_candidates_names_ids() {
        assert_eq!(not_found_message(0x10C4, 0xEA90, None, &[]), "10c4:ea90");
    }

    #[test]
    fn test_not_found_lists_attached_serials() {
        let attached = vec![
            HidDeviceInfo::new(0x10C4, 0xEA90, "/dev/hidraw0").with_serial("00A1"),
            HidDeviceInfo::new(0x10C4, 0xEA90, "/dev/hidraw1"),
        ];
        assert_eq!(
            not_found_message(0x10C4, 0xEA90, Some("FFFF"), &attached),
            "10c4:ea90 serial FFFF (attached: 00A1, <no serial>)"
        );
    }
}
