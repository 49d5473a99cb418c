//! HID transport traits

use crate::{HID_REPORT_SIZE, HidCommonError, HidCommonResult, HidDeviceInfo, Report};
use std::time::Duration;

/// An open HID connection that moves whole reports.
///
/// Interrupt reports are always exactly [`HID_REPORT_SIZE`] bytes with the
/// report ID in byte 0. Feature reports carry their own per-ID length.
pub trait HidTransport: Send {
    fn device_info(&self) -> &HidDeviceInfo;

    /// Send one interrupt OUT report. Anything other than exactly
    /// [`HID_REPORT_SIZE`] bytes is rejected without touching the device.
    fn send_report(&mut self, report: &[u8]) -> HidCommonResult<()>;

    /// Send one feature report, report ID in byte 0.
    fn send_feature_report(&mut self, report: &[u8]) -> HidCommonResult<()>;

    /// Wait up to `timeout` for one interrupt IN report.
    fn receive_report(&mut self, timeout: Duration) -> HidCommonResult<Report>;
}

impl<T: HidTransport + ?Sized> HidTransport for Box<T> {
    fn device_info(&self) -> &HidDeviceInfo {
        (**self).device_info()
    }

    fn send_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        (**self).send_report(report)
    }

    fn send_feature_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
        (**self).send_feature_report(report)
    }

    fn receive_report(&mut self, timeout: Duration) -> HidCommonResult<Report> {
        (**self).receive_report(timeout)
    }
}

/// Reject interrupt reports that are not exactly [`HID_REPORT_SIZE`] bytes.
pub fn check_report_size(report: &[u8]) -> HidCommonResult<()> {
    if report.len() != HID_REPORT_SIZE {
        return Err(HidCommonError::InvalidReportSize {
            expected: HID_REPORT_SIZE,
            actual: report.len(),
        });
    }
    Ok(())
}

/// Copy `data` into a zero-padded report. Longer input is truncated.
pub fn pad_report(data: &[u8]) -> Report {
    let mut report = [0u8; HID_REPORT_SIZE];
    let len = data.len().min(HID_REPORT_SIZE);
    report[..len].copy_from_slice(&data[..len]);
    report
}

pub mod mock {
    //! Scripted transport. Clones share state so a test can keep a handle
    //! after moving the transport into the code under test.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub struct MockHidTransport {
        info: HidDeviceInfo,
        /// `None` entries stand for one receive that times out.
        read_queue: Arc<Mutex<VecDeque<Option<Report>>>>,
        write_history: Arc<Mutex<Vec<Vec<u8>>>>,
        feature_history: Arc<Mutex<Vec<Vec<u8>>>>,
        connected: Arc<Mutex<bool>>,
    }

    impl MockHidTransport {
        pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
            Self {
                info: HidDeviceInfo::new(vendor_id, product_id, path.into()),
                read_queue: Arc::new(Mutex::new(VecDeque::new())),
                write_history: Arc::new(Mutex::new(Vec::new())),
                feature_history: Arc::new(Mutex::new(Vec::new())),
                connected: Arc::new(Mutex::new(true)),
            }
        }

        /// Queue an IN report, zero padded to [`HID_REPORT_SIZE`].
        pub fn queue_read(&self, data: &[u8]) {
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.push_back(Some(pad_report(data)));
        }

        /// Make the next receive time out even if reports are queued behind it.
        pub fn queue_timeout(&self) {
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.push_back(None);
        }

        pub fn pending_reads(&self) -> usize {
            self.read_queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len()
        }

        pub fn write_history(&self) -> Vec<Vec<u8>> {
            let history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.clone()
        }

        pub fn feature_history(&self) -> Vec<Vec<u8>> {
            let history = self
                .feature_history
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            history.clone()
        }

        pub fn disconnect(&self) {
            let mut connected = self.connected.lock().unwrap_or_else(|e| e.into_inner());
            *connected = false;
        }

        pub fn reconnect(&self) {
            let mut connected = self.connected.lock().unwrap_or_else(|e| e.into_inner());
            *connected = true;
        }

        pub fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn ensure_connected(&self) -> HidCommonResult<()> {
            if self.is_connected() {
                Ok(())
            } else {
                Err(HidCommonError::Disconnected)
            }
        }
    }

    impl HidTransport for MockHidTransport {
        fn device_info(&self) -> &HidDeviceInfo {
            &self.info
        }

        fn send_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
            check_report_size(report)?;
            self.ensure_connected()?;
            let mut history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.push(report.to_vec());
            Ok(())
        }

        fn send_feature_report(&mut self, report: &[u8]) -> HidCommonResult<()> {
            self.ensure_connected()?;
            let mut history = self
                .feature_history
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            history.push(report.to_vec());
            Ok(())
        }

        fn receive_report(&mut self, timeout: Duration) -> HidCommonResult<Report> {
            self.ensure_connected()?;
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.pop_front().flatten().ok_or(HidCommonError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}
