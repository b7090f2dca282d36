//! EZ-USB capture device: discovery, RAM access, bulk endpoints.
//!
//! The capture hardware enumerates as an unconfigured EZ-USB FX2
//! (vendor 0x04B4, product 0x8613). After the firmware upload it
//! exposes the capture stream on bulk-IN endpoint `0x86` and accepts
//! command packets on bulk-OUT endpoint `0x01`, both on alternate
//! setting 1 of interface 0.

use std::time::Duration;

use rusb::{DeviceHandle, Direction, GlobalContext, Recipient, RequestType};
use tracing::info;

use crate::error::CaptureError;
use crate::firmware::FirmwareImage;
use crate::transport::CaptureTransport;

/// Cypress vendor ID.
pub const VENDOR_ID: u16 = 0x04b4;
/// Unconfigured FX2 product ID.
pub const PRODUCT_ID: u16 = 0x8613;
/// Capture stream endpoint.
pub const BULK_IN_ENDPOINT: u8 = 0x86;
/// Command packet endpoint.
pub const BULK_OUT_ENDPOINT: u8 = 0x01;

const CAPTURE_INTERFACE: u8 = 0;
const CAPTURE_ALT_SETTING: u8 = 1;
/// Vendor request: write to on-chip RAM.
const REQUEST_WRITE_RAM: u8 = 0xa0;
/// CPU control/status register; bit 0 holds the core in reset.
const CPUCS_REGISTER: u16 = 0xe600;
/// Largest payload one RAM write may carry.
const RAM_WRITE_CHUNK: usize = 64;
const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);

/// An opened, claimed capture device.
pub struct UsbVideoDevice {
    handle: DeviceHandle<GlobalContext>,
}

impl UsbVideoDevice {
    /// Find and claim the capture device.
    ///
    /// Fatal when absent: there is exactly one supported device and no
    /// capture is possible without it.
    pub fn open() -> Result<Self, CaptureError> {
        let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID).ok_or(
            CaptureError::DeviceNotFound {
                vid: VENDOR_ID,
                pid: PRODUCT_ID,
            },
        )?;
        // May fail on platforms without kernel drivers; claiming below
        // is the authoritative check.
        let _ = handle.detach_kernel_driver(CAPTURE_INTERFACE);
        handle.set_active_configuration(1)?;
        handle.claim_interface(CAPTURE_INTERFACE)?;
        handle.set_alternate_setting(CAPTURE_INTERFACE, CAPTURE_ALT_SETTING)?;
        info!("capture device claimed (vid {VENDOR_ID:#06x}, pid {PRODUCT_ID:#06x})");
        Ok(Self { handle })
    }

    /// Write `data` into device RAM at `address`, chunked to the
    /// 64-byte limit of the vendor request.
    pub fn write_ram(&self, address: u16, data: &[u8]) -> Result<(), CaptureError> {
        let request_type =
            rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device);
        for (i, chunk) in data.chunks(RAM_WRITE_CHUNK).enumerate() {
            let chunk_address = (address as usize + i * RAM_WRITE_CHUNK) as u16;
            self.handle
                .write_control(
                    request_type,
                    REQUEST_WRITE_RAM,
                    chunk_address,
                    0,
                    chunk,
                    CONTROL_TIMEOUT,
                )
                .map_err(|source| CaptureError::RamWrite {
                    address: chunk_address,
                    source,
                })?;
        }
        Ok(())
    }

    /// Upload a firmware image and release the device CPU to run it.
    ///
    /// The CPU is held in reset for the duration of the upload; only
    /// data records are written.
    pub fn load_firmware(&self, image: &FirmwareImage) -> Result<(), CaptureError> {
        self.set_cpu_reset(true)?;
        for record in image.data_records() {
            self.write_ram(record.address, &record.data)?;
        }
        self.set_cpu_reset(false)?;
        info!(records = image.record_count(), "firmware loaded");
        Ok(())
    }

    fn set_cpu_reset(&self, held: bool) -> Result<(), CaptureError> {
        self.write_ram(CPUCS_REGISTER, &[u8::from(held)])
    }
}

impl CaptureTransport for UsbVideoDevice {
    fn read_bulk(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CaptureError> {
        match self.handle.read_bulk(BULK_IN_ENDPOINT, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Err(CaptureError::TransferTimeout),
            Err(e) => Err(e.into()),
        }
    }

    fn write_command(&self, payload: &[u8], timeout: Duration) -> Result<(), CaptureError> {
        let sent = self.handle.write_bulk(BULK_OUT_ENDPOINT, payload, timeout)?;
        if sent != payload.len() {
            return Err(CaptureError::ShortCommandWrite {
                sent,
                expected: payload.len(),
            });
        }
        Ok(())
    }
}
