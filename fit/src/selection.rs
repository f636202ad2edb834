//! Device and credential selection
//!
//! Turns selector flags into exactly one device path and at most one
//! credential id, following a fixed precedence:
//!
//! Credentials: hex id, base64url id, `--cred-index` into a fresh
//! enumeration, the platform's own selector, then the first enumerated
//! entry.
//!
//! Devices: `--path`, `--device N`, the only device present, then an
//! interactive prompt. Every failure is final; nothing is retried.

use crate::backend::CredentialEntry;
use crate::encoding::{credential_id_from_b64url, credential_id_from_hex};
use crate::error::{Error, Result};

use std::io::{BufRead, Write};

use tracing::debug;

/// Credential selector flags for one command
#[derive(Debug, Clone, Default)]
pub struct CredentialSelector {
    pub hex: Option<String>,
    pub b64: Option<String>,
    pub index: Option<i64>,
    /// Leave the choice to the platform's selector UI
    pub platform_selector: bool,
}

/// Outcome of credential selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Explicit(Vec<u8>),
    Indexed { index: usize, id: Vec<u8> },
    First(Vec<u8>),
    PlatformSelector,
    NoCredentials,
}

impl Resolution {
    pub fn credential_id(&self) -> Option<&[u8]> {
        match self {
            Resolution::Explicit(id) | Resolution::First(id) => Some(id.as_slice()),
            Resolution::Indexed { id, .. } => Some(id.as_slice()),
            Resolution::PlatformSelector | Resolution::NoCredentials => None,
        }
    }
}

impl CredentialSelector {
    /// True when neither an id nor an index was given
    pub fn is_empty(&self) -> bool {
        self.explicit_flag().is_none() && self.index.is_none()
    }

    /// First non-empty id flag, and whether it is the hex one
    fn explicit_flag(&self) -> Option<(&str, bool)> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.is_empty())
        }
        non_empty(&self.hex)
            .map(|v| (v, true))
            .or_else(|| non_empty(&self.b64).map(|v| (v, false)))
    }

    /// Decode an id given on the command line; hex wins over base64url
    pub fn explicit_id(&self) -> Result<Option<Vec<u8>>> {
        match self.explicit_flag() {
            Some((value, true)) => credential_id_from_hex(value).map(Some),
            Some((value, false)) => credential_id_from_b64url(value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a credential, calling `enumerate` at most once
    ///
    /// `enumerate` is only invoked when neither an explicit id nor the
    /// platform selector settles the choice.
    pub fn resolve<F, E>(&self, enumerate: F) -> std::result::Result<Resolution, E>
    where
        F: FnOnce() -> std::result::Result<Vec<CredentialEntry>, E>,
        E: From<Error>,
    {
        if let Some(id) = self.explicit_id()? {
            return Ok(Resolution::Explicit(id));
        }

        if let Some(index) = self.index {
            let entries = enumerate()?;
            let picked = usize::try_from(index)
                .ok()
                .filter(|i| *i < entries.len())
                .ok_or(Error::CredentialIndexOutOfRange { have: entries.len() })?;
            debug!(index = picked, "credential selected by index");
            let id = entries.into_iter().nth(picked).map(|e| e.id).unwrap_or_default();
            return Ok(Resolution::Indexed { index: picked, id });
        }

        if self.platform_selector {
            return Ok(Resolution::PlatformSelector);
        }

        Ok(match enumerate()?.into_iter().next() {
            Some(entry) => Resolution::First(entry.id),
            None => Resolution::NoCredentials,
        })
    }
}

/// Where an authenticator was found
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceLocation {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String,
    pub product: String,
}

impl DeviceLocation {
    /// `manufacturer product`, or `Unknown device` when both are blank
    pub fn label(&self) -> String {
        let label = format!("{} {}", self.manufacturer.trim(), self.product.trim());
        match label.trim() {
            "" => "Unknown device".to_string(),
            trimmed => trimmed.to_string(),
        }
    }
}

/// Device selector flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    pub index: Option<i64>,
    pub path: Option<String>,
}

/// Pick the path of the device to open
///
/// Prompts on `out` and reads one line from `input` only when several
/// devices are present and no selector flag was given.
pub fn select_device_path<R: BufRead, W: Write>(
    locations: &[DeviceLocation],
    selector: &DeviceSelector,
    input: &mut R,
    out: &mut W,
) -> Result<String> {
    if locations.is_empty() {
        return Err(Error::NoDevices);
    }

    if let Some(path) = selector.path.as_deref().filter(|p| !p.is_empty()) {
        return Ok(path.to_string());
    }

    if let Some(index) = selector.index {
        return usize::try_from(index)
            .ok()
            .and_then(|i| locations.get(i))
            .map(|loc| loc.path.clone())
            .ok_or(Error::InvalidDeviceIndex(index));
    }

    if let [only] = locations {
        debug!(path = %only.path, "auto-selected the only device");
        return Ok(only.path.clone());
    }

    writeln!(out, "Found FIDO2 devices:")?;
    for (i, loc) in locations.iter().enumerate() {
        writeln!(out, "  [{}] {} (Path: {})", i, loc.label(), loc.path)?;
    }
    write!(out, "Select a device (enter number): ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    let index: usize = answer
        .parse()
        .map_err(|_| Error::InvalidSelection(format!("{answer:?} is not a device number")))?;
    locations
        .get(index)
        .map(|loc| loc.path.clone())
        .ok_or_else(|| Error::InvalidSelection(format!("no device at index {index}")))
}
