//! `fit info`: non-destructive diagnostics

use super::Console;
use crate::cli::InfoArgs;
use crate::error::Error;
use crate::hid::{DeviceProvider, open_device};
use crate::output::{CtapHidReport, InfoReport, ResidentKeysReport};

use fit_transport::InitResponse;

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::warn;

/// `fido2` when the device speaks CTAPHID_CBOR, `u2f` otherwise
pub fn device_type(hid: &InitResponse) -> &'static str {
    if hid.capabilities.cbor() {
        "fido2"
    } else {
        "u2f"
    }
}

pub fn run<P, R, W>(
    provider: &P,
    args: &InfoArgs,
    input: &mut R,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: DeviceProvider,
    R: BufRead,
    W: Write,
{
    let mut device = open_device(provider, &args.device.selector(), input, console.out())?;

    console.notice("Fetching device information...")?;
    let info = device.get_info().map_err(Error::from).context("Info failed")?;
    let hid = *device.hid_info();

    let pin_retry_count = match device.pin_retries() {
        Ok(retries) => Some(retries),
        Err(e) => {
            warn!("PIN retry count unavailable: {e}");
            None
        }
    };
    let resident_keys = match args.pin.as_deref().filter(|p| !p.is_empty()) {
        Some(pin) => match device.credentials_metadata(pin) {
            Ok(meta) => Some(ResidentKeysReport {
                existing: meta.existing,
                remaining: meta.remaining,
            }),
            Err(e) => {
                warn!("resident key counts unavailable: {e}");
                None
            }
        },
        None => None,
    };

    let report = InfoReport {
        backend: "hid",
        device_type: device_type(&hid),
        is_fido2: info.is_fido2(),
        versions: info.versions.clone(),
        extensions: info.extensions.clone(),
        ctap_hid: Some(CtapHidReport {
            major: hid.major,
            minor: hid.minor,
            build: hid.build,
            flags: hid.capabilities.0,
        }),
        options: info.options.clone(),
        pin_retry_count,
        resident_keys,
    };

    if console.is_json() {
        console.json(&report)?;
        return Ok(());
    }

    console.line("")?;
    console.line("Device summary:")?;
    console.line(format!(
        "  Type: {}  IsFIDO2: {}",
        report.device_type, report.is_fido2
    ))?;
    if let Some(hid) = &report.ctap_hid {
        console.line(format!(
            "  CTAP HID: v{}.{} build {} flags=0x{:02x}",
            hid.major, hid.minor, hid.build, hid.flags
        ))?;
    }
    if !report.versions.is_empty() {
        console.line(format!("  Versions: {}", report.versions.join(", ")))?;
    }
    if !report.extensions.is_empty() {
        console.line(format!("  Extensions: {}", report.extensions.join(", ")))?;
    }
    if !report.options.is_empty() {
        console.line("  Options:")?;
        for (name, value) in &report.options {
            console.line(format!("    - {name} = {value}"))?;
        }
    }
    if let Some(retries) = report.pin_retry_count {
        console.line(format!("  PIN Retry Count: {retries}"))?;
    }
    if let Some(keys) = &report.resident_keys {
        console.line(format!(
            "  Resident Keys: existing={} remaining={}",
            keys.existing, keys.remaining
        ))?;
    }
    console.line("")?;
    console.line("Test completed.")?;
    Ok(())
}
