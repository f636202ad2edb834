//! Security keys over USB HID

mod backend;
mod provider;

pub use backend::HidBackend;
pub use provider::{DeviceProvider, UsbProvider, open_device};
