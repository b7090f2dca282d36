//! Firmware image parsing.
//!
//! The device program ships as line-oriented ASCII-hex records:
//!
//! ```text
//! :SSAAAATTdd…dd
//!  │ │   │ └ SS payload bytes
//!  │ │   └ record type (00 = data; others carry no payload we use)
//!  │ └ 16-bit load address
//!  └ payload size
//! ```
//!
//! Only data records are written to the device; trailing checksum
//! characters are not verified. See
//! [`UsbVideoDevice::load_firmware`](crate::device::UsbVideoDevice::load_firmware)
//! for the upload itself.

use crate::error::CaptureError;

/// Largest payload one record may carry (one RAM write).
pub const MAX_RECORD_PAYLOAD: usize = 64;

/// Record type carrying loadable bytes.
pub const RECORD_TYPE_DATA: u8 = 0x00;

/// One parsed firmware record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareRecord {
    /// Device RAM load address.
    pub address: u16,
    /// Record type; only [`RECORD_TYPE_DATA`] is uploaded.
    pub record_type: u8,
    /// Payload bytes.
    pub data: Vec<u8>,
}

impl FirmwareRecord {
    pub fn is_data(&self) -> bool {
        self.record_type == RECORD_TYPE_DATA
    }
}

/// A parsed firmware image.
#[derive(Debug, Clone, Default)]
pub struct FirmwareImage {
    records: Vec<FirmwareRecord>,
}

impl FirmwareImage {
    /// Parse an image from its text lines. Blank lines are skipped;
    /// anything else must be a well-formed record.
    pub fn parse<I, S>(lines: I) -> Result<Self, CaptureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let line_no = index + 1;
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            records.push(Self::parse_record(line, line_no)?);
        }
        Ok(Self { records })
    }

    /// Parse an image from a whole file's contents.
    pub fn parse_str(text: &str) -> Result<Self, CaptureError> {
        Self::parse(text.lines())
    }

    /// All records, in file order.
    pub fn records(&self) -> &[FirmwareRecord] {
        &self.records
    }

    /// Records that get uploaded.
    pub fn data_records(&self) -> impl Iterator<Item = &FirmwareRecord> {
        self.records.iter().filter(|r| r.is_data())
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parse_record(line: &str, line_no: usize) -> Result<FirmwareRecord, CaptureError> {
        let invalid = |reason: &'static str| CaptureError::InvalidRecord {
            line: line_no,
            reason,
        };

        if !line.is_ascii() {
            return Err(invalid("record is not ASCII"));
        }
        let rest = line.strip_prefix(':').ok_or(invalid("missing ':' prefix"))?;
        if rest.len() < 8 {
            return Err(invalid("record header truncated"));
        }

        let size = usize::from(Self::hex_byte(&rest[0..2], line_no)?);
        if size > MAX_RECORD_PAYLOAD {
            return Err(invalid("payload exceeds 64 bytes"));
        }
        let address = u16::from_str_radix(&rest[2..6], 16)
            .map_err(|_| invalid("invalid load address"))?;
        let record_type = Self::hex_byte(&rest[6..8], line_no)?;

        if rest.len() < 8 + size * 2 {
            return Err(invalid("payload truncated"));
        }
        let mut data = Vec::with_capacity(size);
        for i in 0..size {
            data.push(Self::hex_byte(&rest[8 + i * 2..10 + i * 2], line_no)?);
        }

        Ok(FirmwareRecord {
            address,
            record_type,
            data,
        })
    }

    fn hex_byte(pair: &str, line_no: usize) -> Result<u8, CaptureError> {
        u8::from_str_radix(pair, 16).map_err(|_| CaptureError::InvalidRecord {
            line: line_no,
            reason: "invalid hex digits",
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_data_record() {
        let image = FirmwareImage::parse_str(":03010000AABBCC71").unwrap();
        assert_eq!(image.record_count(), 1);
        let record = &image.records()[0];
        assert_eq!(record.address, 0x0100);
        assert_eq!(record.record_type, RECORD_TYPE_DATA);
        assert_eq!(record.data, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn non_data_records_are_kept_but_not_uploaded() {
        let image = FirmwareImage::parse_str(":020000040000FA\n:00000001FF").unwrap();
        assert_eq!(image.record_count(), 2);
        assert_eq!(image.data_records().count(), 0);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let image = FirmwareImage::parse_str("\n:0100000042BD\n\n").unwrap();
        assert_eq!(image.record_count(), 1);
        assert_eq!(image.records()[0].data, vec![0x42]);
    }

    #[test]
    fn trailing_checksum_characters_are_ignored() {
        // Payload of 1 byte; everything after it is not interpreted.
        let image = FirmwareImage::parse_str(":01E600000118DEADBEEF").unwrap();
        assert_eq!(image.records()[0].address, 0xE600);
        assert_eq!(image.records()[0].data, vec![0x01]);
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = FirmwareImage::parse_str("03010000AABBCC").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRecord { line: 1, .. }));
    }

    #[test]
    fn rejects_truncated_payload() {
        let err = FirmwareImage::parse_str(":04010000AABB").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRecord { .. }));
    }

    #[test]
    fn rejects_oversized_payload() {
        let mut line = String::from(":48000000");
        line.push_str(&"00".repeat(0x48));
        let err = FirmwareImage::parse_str(&line).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRecord { .. }));
    }

    #[test]
    fn rejects_bad_hex() {
        let err = FirmwareImage::parse_str(":01000000GG").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRecord { .. }));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = FirmwareImage::parse_str(":0100000042BD\nnot-a-record").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRecord { line: 2, .. }));
    }
}
