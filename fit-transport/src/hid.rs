//! USB HID access through hidapi
//!
//! FIDO authenticators expose a HID interface with usage page 0xF1D0 and
//! usage 0x01. Every report is 64 bytes; writes carry a leading report ID
//! of zero as hidapi requires.

use crate::channel::HidIo;
use crate::ctaphid::{PACKET_SIZE, Packet};
use crate::error::{Error, Result};

use std::ffi::CString;
use std::time::Duration;

use hidapi::HidApi;
use tracing::debug;

/// FIDO HID usage page
const FIDO_USAGE_PAGE: u16 = 0xF1D0;

/// FIDO HID usage (CTAPHID)
const FIDO_USAGE: u16 = 0x01;

/// A FIDO HID interface found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceInfo {
    /// Platform-specific device path
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

/// Create the hidapi context
pub fn init_hidapi() -> Result<HidApi> {
    HidApi::new().map_err(|e| Error::Hid(format!("Failed to initialize HID API: {}", e)))
}

/// List connected FIDO authenticators
pub fn enumerate(api: &HidApi) -> Vec<HidDeviceInfo> {
    api.device_list()
        .filter(|info| info.usage_page() == FIDO_USAGE_PAGE && info.usage() == FIDO_USAGE)
        .map(|info| HidDeviceInfo {
            path: info.path().to_string_lossy().into_owned(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
            serial_number: info.serial_number().map(str::to_owned),
        })
        .collect()
}

/// An open HID device
///
/// The handle is closed when this value is dropped.
pub struct HidDevice {
    device: hidapi::HidDevice,
    path: String,
}

impl HidDevice {
    /// Open a device by the path reported from [`enumerate`]
    pub fn open(api: &HidApi, path: &str) -> Result<Self> {
        let c_path = CString::new(path)
            .map_err(|e| Error::Hid(format!("Invalid device path: {}", e)))?;
        let device = api
            .open_path(&c_path)
            .map_err(|e| Error::Hid(format!("Failed to open {}: {}", path, e)))?;

        debug!(path, "opened HID device");
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl HidIo for HidDevice {
    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let mut report = [0u8; PACKET_SIZE + 1];
        report[1..].copy_from_slice(packet.as_bytes());

        let written = self
            .device
            .write(&report)
            .map_err(|e| Error::Hid(format!("Failed to write packet: {}", e)))?;

        // Windows reports the report ID byte as written, other platforms may not
        if written < PACKET_SIZE {
            return Err(Error::Hid(format!(
                "Incomplete write: {} of {} bytes",
                written,
                report.len()
            )));
        }
        Ok(())
    }

    fn read_packet(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        let mut buf = [0u8; PACKET_SIZE];
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let read = self
            .device
            .read_timeout(&mut buf, millis)
            .map_err(|e| Error::Hid(format!("Failed to read packet: {}", e)))?;

        if read == 0 {
            return Ok(None);
        }
        Packet::from_report(&buf[..read]).map(Some)
    }
}

impl Drop for HidDevice {
    fn drop(&mut self) {
        debug!(path = %self.path, "closing HID device");
    }
}
