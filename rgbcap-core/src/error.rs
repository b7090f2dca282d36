//! Domain-specific error types for the capture pipeline.
//!
//! All fallible operations return `Result<T, CaptureError>`.
//! Transient stream conditions (sync loss, reader starvation) are typed
//! and recoverable; only device-level failures are fatal.

use thiserror::Error;

/// The canonical error type for the capture pipeline.
#[derive(Debug, Error)]
pub enum CaptureError {
    // ── Device Errors ────────────────────────────────────────────
    /// No USB device matching the expected vendor/product IDs.
    #[error("capture device not found (vid {vid:#06x}, pid {pid:#06x})")]
    DeviceNotFound { vid: u16, pid: u16 },

    /// A libusb operation failed.
    #[error("usb error: {0}")]
    Usb(#[from] rusb::Error),

    // ── Firmware Errors ──────────────────────────────────────────
    /// A firmware hex record could not be parsed.
    #[error("invalid firmware record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: &'static str },

    /// Writing a firmware chunk into device RAM failed.
    #[error("firmware upload failed at {address:#06x}")]
    RamWrite {
        address: u16,
        #[source]
        source: rusb::Error,
    },

    // ── Transfer Errors ──────────────────────────────────────────
    /// A bulk-read completion wait exceeded its deadline.
    ///
    /// Non-fatal: the scheduler publishes nothing for the slot and
    /// resubmits the descriptor.
    #[error("bulk transfer timed out")]
    TransferTimeout,

    /// The scheduler thread terminated abnormally.
    #[error("transfer scheduler failed: {0}")]
    Scheduler(String),

    // ── Decode Errors ────────────────────────────────────────────
    /// Sync bits dropped out of the active-video state mid-frame.
    ///
    /// Recoverable: the frame in progress is abandoned and acquisition
    /// restarts on the next cycle.
    #[error("sync lost during active video (row {row})")]
    SyncLost { row: usize },

    /// The pipeline was asked to shut down while a frame was in flight.
    #[error("capture cancelled")]
    Cancelled,

    // ── Command Errors ───────────────────────────────────────────
    /// The device accepted fewer command bytes than were sent.
    #[error("short command write: sent {sent} of {expected} bytes")]
    ShortCommandWrite { sent: usize, expected: usize },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl From<String> for CaptureError {
    fn from(s: String) -> Self {
        CaptureError::Other(s)
    }
}

impl From<&str> for CaptureError {
    fn from(s: &str) -> Self {
        CaptureError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CaptureError::DeviceNotFound {
            vid: 0x04b4,
            pid: 0x8613,
        };
        assert!(e.to_string().contains("0x04b4"));
        assert!(e.to_string().contains("0x8613"));

        let e = CaptureError::SyncLost { row: 42 };
        assert!(e.to_string().contains("42"));
    }

    #[test]
    fn from_string() {
        let e: CaptureError = "something broke".into();
        assert!(matches!(e, CaptureError::Other(_)));
    }

    #[test]
    fn from_usb() {
        let e: CaptureError = rusb::Error::NoDevice.into();
        assert!(matches!(e, CaptureError::Usb(_)));
    }
}
