//! CTAPHID transport for the fit FIDO2 tool
//!
//! Host side of CTAP over USB HID:
//! - Message framing, fragmentation, and reassembly
//! - Channel allocation (CTAPHID_INIT) and KEEPALIVE handling
//! - Device enumeration and packet I/O via hidapi - requires "usb" feature
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#usb>

pub mod channel;
pub mod ctaphid;
pub mod error;
#[cfg(feature = "usb")]
pub mod hid;

pub use channel::{Channel, HidIo};
pub use ctaphid::{Capabilities, Cmd, InitResponse, Message, Packet};
pub use error::{Error, Result};
#[cfg(feature = "usb")]
pub use hid::{HidDevice, HidDeviceInfo, enumerate, init_hidapi};
#[cfg(feature = "usb")]
pub use hidapi::HidApi;
