//! Finding and opening security keys

use crate::error::Result;
use crate::selection::{DeviceLocation, DeviceSelector, select_device_path};

use fit_ctap::Device;
use fit_transport::{HidApi, HidDevice, HidDeviceInfo, HidIo};

use std::cell::OnceCell;
use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::debug;

/// Source of authenticator locations and connections
pub trait DeviceProvider {
    type Io: HidIo;

    fn locations(&self) -> Result<Vec<DeviceLocation>>;

    fn open(&self, path: &str) -> Result<Self::Io>;
}

impl From<HidDeviceInfo> for DeviceLocation {
    fn from(info: HidDeviceInfo) -> Self {
        Self {
            path: info.path,
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            manufacturer: info.manufacturer.unwrap_or_default(),
            product: info.product.unwrap_or_default(),
        }
    }
}

/// Security keys attached over USB, found through hidapi
///
/// hidapi is initialized on first use, so commands that never touch a
/// device do not need HID access.
#[derive(Default)]
pub struct UsbProvider {
    api: OnceCell<HidApi>,
}

impl UsbProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> Result<&HidApi> {
        if let Some(api) = self.api.get() {
            return Ok(api);
        }
        let api = fit_transport::init_hidapi()?;
        Ok(self.api.get_or_init(|| api))
    }
}

impl DeviceProvider for UsbProvider {
    type Io = HidDevice;

    fn locations(&self) -> Result<Vec<DeviceLocation>> {
        let locations: Vec<DeviceLocation> = fit_transport::enumerate(self.api()?)
            .into_iter()
            .map(DeviceLocation::from)
            .collect();
        debug!(count = locations.len(), "enumerated FIDO HID devices");
        Ok(locations)
    }

    fn open(&self, path: &str) -> Result<HidDevice> {
        Ok(HidDevice::open(self.api()?, path)?)
    }
}

/// Resolve the selector flags and open a CTAP2 session on the chosen device
pub fn open_device<P, R, W>(
    provider: &P,
    selector: &DeviceSelector,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Device<P::Io>>
where
    P: DeviceProvider,
    R: BufRead,
    W: Write,
{
    let locations = provider
        .locations()
        .context("Failed to get device locations")?;
    let path = select_device_path(&locations, selector, input, out)?;
    let io = provider.open(&path).context("Failed to open device")?;
    Device::open(io)
        .map_err(crate::Error::from)
        .context("Failed to open device")
}
