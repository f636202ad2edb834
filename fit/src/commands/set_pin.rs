//! `fit set-pin`: set an initial PIN or change an existing one

use super::Console;
use crate::cli::{SET_PIN_USAGE, SetPinArgs};
use crate::error::Error;
use crate::hid::{DeviceProvider, open_device};

use fit_ctap::{AuthenticatorInfo, StatusCode};

use std::io::{BufRead, Write};

use anyhow::Context;

/// Shortest PIN accepted before talking to the device
pub const MIN_PIN_CHARS: usize = 4;

/// Guidance printed after a failed PIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinHint {
    PinAlreadySet,
    WrongOldPin,
    PolicyRejected,
}

impl PinHint {
    pub fn message(self) -> &'static str {
        match self {
            PinHint::PinAlreadySet => {
                "Device reports a PIN already exists. Provide --old to change it."
            }
            PinHint::WrongOldPin => "Old PIN incorrect (remaining retries may decrease).",
            PinHint::PolicyRejected => {
                "PIN rejected by policy (length/complexity). Try a longer PIN (>=4, preferably 6+ digits)."
            }
        }
    }
}

/// Hints for a failed set/change
///
/// A CTAP status code decides on its own. Without one, the error text is
/// searched for keywords; that match is a guess and may yield several
/// hints or none.
pub fn classify(err: &Error, changing: bool) -> Vec<PinHint> {
    if let Some(status) = err.status() {
        let hint = match status {
            StatusCode::PinAuthInvalid | StatusCode::PinRequired | StatusCode::MissingParameter
                if !changing =>
            {
                Some(PinHint::PinAlreadySet)
            }
            StatusCode::PinInvalid
            | StatusCode::PinAuthInvalid
            | StatusCode::PinBlocked
            | StatusCode::PinAuthBlocked => Some(PinHint::WrongOldPin),
            StatusCode::PinPolicyViolation => Some(PinHint::PolicyRejected),
            _ => None,
        };
        return hint.into_iter().collect();
    }
    if matches!(err, Error::Ctap(fit_ctap::Error::PinTooLong)) {
        return vec![PinHint::PolicyRejected];
    }

    let msg = err.to_string().to_lowercase();
    let has = |needle: &str| msg.contains(needle);
    let mut hints = Vec::new();
    if !changing && (has("pin required") || has("missing parameter")) {
        hints.push(PinHint::PinAlreadySet);
    }
    if has("mismatch") || has("wrong") {
        hints.push(PinHint::WrongOldPin);
    }
    if has("policy") || has("invalid") || has("too short") || has("length") {
        hints.push(PinHint::PolicyRejected);
    }
    hints
}

/// clientPin line from getInfo; the option name is matched case-insensitively
fn client_pin_status(info: &AuthenticatorInfo) -> &'static str {
    let client_pin = info
        .options
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("clientPin"))
        .map(|(_, set)| *set);
    match client_pin {
        None => "Device does not implement clientPin.",
        Some(true) => "Device reports PIN is set (clientPin=true). If changing, provide --old.",
        Some(false) => {
            "Device reports PIN not set yet (clientPin=false). Set initial PIN with --new."
        }
    }
}

pub fn run<P, R, W>(
    provider: &P,
    args: &SetPinArgs,
    input: &mut R,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: DeviceProvider,
    R: BufRead,
    W: Write,
{
    let Some(new_pin) = args.new.as_deref().filter(|p| !p.is_empty()) else {
        console.line(SET_PIN_USAGE)?;
        return Ok(());
    };
    if new_pin.chars().count() < MIN_PIN_CHARS {
        console.line("PIN must be at least 4 characters.")?;
        return Ok(());
    }
    let old_pin = args.old.as_deref().filter(|p| !p.is_empty());

    let mut device = open_device(provider, &args.device.selector(), input, console.out())?;
    let info = device
        .get_info()
        .map_err(Error::from)
        .context("Failed to get device info")?;
    console.line(client_pin_status(&info))?;

    let action = if old_pin.is_some() {
        "Changing PIN"
    } else {
        "Setting initial PIN"
    };
    console.line(format!("{action}... You may need to touch your device."))?;

    let result = match old_pin {
        Some(old) => device.change_pin(old, new_pin),
        None => device.set_pin(new_pin),
    };
    if let Err(e) = result.map_err(Error::from) {
        for hint in classify(&e, old_pin.is_some()) {
            console.line(hint.message())?;
        }
        return Err(anyhow::Error::new(e).context("Failed to set PIN"));
    }

    console.line("PIN updated successfully.")?;
    Ok(())
}
