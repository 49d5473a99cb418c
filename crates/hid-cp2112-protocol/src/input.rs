//! Bridge-to-host report decoders

use crate::ids::report_ids;
use crate::{Cp2112ProtocolError, Cp2112Result, MAX_READ_CHUNK_LEN, TransferStatus};
use chargewatch_hid_common::ReportParser;

fn expect_id(parser: &mut ReportParser<'_>, expected: u8) -> Cp2112Result<()> {
    let actual = parser.read_u8()?;
    if actual != expected {
        return Err(Cp2112ProtocolError::UnexpectedReportId { expected, actual });
    }
    Ok(())
}

/// Report ID of an incoming report, if any.
pub fn report_id(report: &[u8]) -> Option<u8> {
    report.first().copied()
}

/// Decoded Transfer Status Response (0x16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStatusResponse {
    pub status: TransferStatus,
    /// Raw status1 byte; its meaning depends on `status`.
    pub detail: u8,
    pub retries: u16,
    pub bytes_read: u16,
}

impl TransferStatusResponse {
    pub fn parse(report: &[u8]) -> Cp2112Result<Self> {
        let mut p = ReportParser::new(report);
        expect_id(&mut p, report_ids::TRANSFER_STATUS_RESPONSE)?;
        let status0 = p.read_u8()?;
        let detail = p.read_u8()?;
        let retries = p.read_u16_be()?;
        let bytes_read = p.read_u16_be()?;
        Ok(Self {
            status: TransferStatus::from_bytes(status0, detail)?,
            detail,
            retries,
            bytes_read,
        })
    }
}

/// Decoded Data Read Response (0x13). Data is held inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataReadResponse {
    pub status: TransferStatus,
    len: usize,
    data: [u8; MAX_READ_CHUNK_LEN],
}

impl DataReadResponse {
    pub fn parse(report: &[u8]) -> Cp2112Result<Self> {
        let mut p = ReportParser::new(report);
        expect_id(&mut p, report_ids::DATA_READ_RESPONSE)?;
        // The read response has no second status byte.
        let status = TransferStatus::from_bytes(p.read_u8()?, 0)?;
        let len = p.read_u8()? as usize;
        if len > MAX_READ_CHUNK_LEN {
            return Err(Cp2112ProtocolError::InvalidReadLength(len));
        }
        let mut data = [0u8; MAX_READ_CHUNK_LEN];
        data[..len].copy_from_slice(p.read_bytes(len)?);
        Ok(Self { status, len, data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransferError;
    use chargewatch_hid_common::pad_report;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_complete_status() -> TestResult {
        let report = pad_report(&[0x16, 0x02, 0x05, 0x00, 0x01, 0x00, 0x02]);
        let status = TransferStatusResponse::parse(&report)?;
        assert_eq!(status.status, TransferStatus::Complete);
        assert_eq!(status.retries, 1);
        assert_eq!(status.bytes_read, 2);
        Ok(())
    }

    #[test]
    fn test_parse_nack_status() -> TestResult {
        let report = pad_report(&[0x16, 0x03, 0x00]);
        let status = TransferStatusResponse::parse(&report)?;
        assert_eq!(status.status, TransferStatus::Error(TransferError::AddressNack));
        Ok(())
    }

    #[test]
    fn test_parse_wrong_report_id() {
        let report = pad_report(&[0x13, 0x02, 0x02, 0xAA, 0x55]);
        assert_eq!(
            TransferStatusResponse::parse(&report),
            Err(Cp2112ProtocolError::UnexpectedReportId {
                expected: 0x16,
                actual: 0x13
            })
        );
    }

    #[test]
    fn test_parse_truncated_status() {
        assert!(TransferStatusResponse::parse(&[0x16, 0x02]).is_err());
        assert!(TransferStatusResponse::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_read_response() -> TestResult {
        let report = pad_report(&[0x13, 0x02, 0x02, 0xFE, 0x3F]);
        let resp = DataReadResponse::parse(&report)?;
        assert_eq!(resp.status, TransferStatus::Complete);
        assert_eq!(resp.data(), &[0xFE, 0x3F]);
        assert_eq!(resp.len(), 2);
        Ok(())
    }

    #[test]
    fn test_parse_read_response_bad_length() {
        let report = pad_report(&[0x13, 0x02, 62]);
        assert_eq!(
            DataReadResponse::parse(&report),
            Err(Cp2112ProtocolError::InvalidReadLength(62))
        );
    }

    #[test]
    fn test_report_id() {
        assert_eq!(report_id(&[0x16, 0x00]), Some(0x16));
        assert_eq!(report_id(&[]), None);
    }
}
