//! Transport seam between the pipeline and the USB stack.
//!
//! The scheduler and command channel talk to [`CaptureTransport`]
//! rather than to `rusb` directly, so the whole pipeline runs against
//! an in-memory transport in tests. The production implementation lives
//! on [`UsbVideoDevice`](crate::device::UsbVideoDevice).
//!
//! `rusb` exposes blocking transfers only, so a "submitted" descriptor
//! completes inside `read_bulk`; descriptor accounting, slot binding
//! and drain semantics are kept in the scheduler.

use std::time::Duration;

use crate::error::CaptureError;

/// Bulk capture stream plus command endpoint of one device.
pub trait CaptureTransport: Send + Sync + 'static {
    /// Read one bulk-IN transfer into `buf`.
    ///
    /// Returns the transferred length; `Err(TransferTimeout)` when the
    /// deadline passes with no completion.
    fn read_bulk(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CaptureError>;

    /// Write one command packet to the bulk-OUT endpoint.
    ///
    /// Must only be called while no bulk-IN transfers are in flight;
    /// the [`CaptureSession`](crate::session::CaptureSession) enforces
    /// this by stopping the scheduler first.
    fn write_command(&self, payload: &[u8], timeout: Duration) -> Result<(), CaptureError>;
}
