use super::Console;
use crate::hid::DeviceProvider;
use crate::output::{DeviceListReport, DeviceReport};

use std::io::Write;

use anyhow::Context;

pub fn run<P: DeviceProvider, W: Write>(
    provider: &P,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()> {
    let locations = provider
        .locations()
        .context("Failed to get device locations")?;

    if console.is_json() {
        let devices = locations
            .iter()
            .enumerate()
            .map(|(index, loc)| DeviceReport {
                index,
                label: loc.label(),
                vid: loc.vendor_id,
                pid: loc.product_id,
                path: loc.path.clone(),
            })
            .collect();
        console.json(&DeviceListReport {
            backend: "hid",
            devices,
        })?;
        return Ok(());
    }

    if locations.is_empty() {
        console.line("No FIDO2 devices found.")?;
        return Ok(());
    }
    console.line("Detected FIDO devices:")?;
    for (i, loc) in locations.iter().enumerate() {
        console.line(format!(
            "  [{}] {}  VID:PID={:04x}:{:04x}  Path={}",
            i,
            loc.label(),
            loc.vendor_id,
            loc.product_id,
            loc.path
        ))?;
    }
    Ok(())
}
