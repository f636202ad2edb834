use super::Console;
use crate::cli::DeviceArgs;
use crate::error::Error;
use crate::hid::{DeviceProvider, open_device};

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::info;

/// True only for a `yes` answer, ignoring case and surrounding whitespace
pub fn confirmed(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Factory reset after an explicit confirmation
///
/// The confirmation is read before any device is enumerated or opened.
pub fn run<P, R, W>(
    provider: &P,
    args: &DeviceArgs,
    input: &mut R,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: DeviceProvider,
    R: BufRead,
    W: Write,
{
    console.line("WARNING: This will perform a factory reset on a FIDO2 device.")?;
    console.line("This is a destructive and irreversible action that will wipe all credentials.")?;
    let out = console.out();
    write!(out, "Are you sure you want to proceed? (yes/no): ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if !confirmed(&answer) {
        console.line("Aborting reset.")?;
        return Ok(());
    }

    let mut device = open_device(provider, &args.selector(), input, console.out())?;
    console.line("Performing device reset. You may need to touch your device now.")?;
    device
        .reset()
        .map_err(Error::from)
        .context("Failed to reset device")?;
    info!("device reset");

    console.line("Device has been successfully reset.")?;
    Ok(())
}
