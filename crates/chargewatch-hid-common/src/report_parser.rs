//! HID report parsing utilities
//!
//! The bridge encodes multi-byte fields big-endian, so only big-endian
//! accessors are provided.

use crate::{HID_REPORT_SIZE, HidCommonError, HidCommonResult, Report};

fn end_of_data() -> HidCommonError {
    HidCommonError::InvalidReport("Unexpected end of data".to_string())
}

/// Cursor over a borrowed report.
pub struct ReportParser<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buffer: data,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn read_u8(&mut self) -> HidCommonResult<u8> {
        let value = *self.buffer.get(self.position).ok_or_else(end_of_data)?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16_be(&mut self) -> HidCommonResult<u16> {
        let hi = self.read_u8()? as u16;
        let lo = self.read_u8()? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn read_bytes(&mut self, count: usize) -> HidCommonResult<&'a [u8]> {
        let end = self.position.checked_add(count).ok_or_else(end_of_data)?;
        let bytes = self.buffer.get(self.position..end).ok_or_else(end_of_data)?;
        self.position = end;
        Ok(bytes)
    }
}

/// Writes into a zero-filled buffer of fixed length. Writes past the end
/// are rejected rather than growing the report.
pub struct ReportBuilder {
    buffer: Vec<u8>,
    position: usize,
}

impl ReportBuilder {
    /// Start a report of `len` bytes with `report_id` in byte 0.
    pub fn new(report_id: u8, len: usize) -> Self {
        let mut buffer = vec![0u8; len.max(1)];
        buffer[0] = report_id;
        Self {
            buffer,
            position: 1,
        }
    }

    /// Start a full-size interrupt report.
    pub fn interrupt(report_id: u8) -> Self {
        Self::new(report_id, HID_REPORT_SIZE)
    }

    pub fn write_u8(&mut self, value: u8) -> HidCommonResult<&mut Self> {
        self.write_bytes(&[value])
    }

    pub fn write_u16_be(&mut self, value: u16) -> HidCommonResult<&mut Self> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32_be(&mut self, value: u32) -> HidCommonResult<&mut Self> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> HidCommonResult<&mut Self> {
        let end = self.position + data.len();
        if end > self.buffer.len() {
            return Err(HidCommonError::InvalidReport(format!(
                "{} bytes do not fit in a {}-byte report",
                end,
                self.buffer.len()
            )));
        }
        self.buffer[self.position..end].copy_from_slice(data);
        self.position = end;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Finish an interrupt report. Fails unless the builder was sized to
    /// [`HID_REPORT_SIZE`].
    pub fn into_report(self) -> HidCommonResult<Report> {
        let actual = self.buffer.len();
        self.buffer
            .try_into()
            .map_err(|_| HidCommonError::InvalidReportSize {
                expected: HID_REPORT_SIZE,
                actual,
            })
    }
}
