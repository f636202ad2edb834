use super::{Console, NewCredential, create_with, user_and_display};
use crate::backend::Backend;
use crate::challenge::{CHALLENGE_LEN, ChallengeSource};
use crate::cli::{ADD_PASSKEY_USAGE, AddPasskeyArgs};
use crate::encoding::{to_b64url, to_hex};
use crate::hid::{DeviceProvider, HidBackend, open_device};
use crate::output::KeyCredentialReport;

use std::io::{BufRead, Write};

/// Create a passkey on a security key
///
/// The user handle is 32 fresh random bytes; the display name defaults to
/// the user name.
pub fn run<P, C, R, W>(
    provider: &P,
    challenges: &mut C,
    args: &AddPasskeyArgs,
    input: &mut R,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: DeviceProvider,
    C: ChallengeSource,
    R: BufRead,
    W: Write,
{
    let Some(rp_id) = args.rp.as_deref().filter(|rp| !rp.is_empty()) else {
        console.line(ADD_PASSKEY_USAGE)?;
        return Ok(());
    };
    let config = console.config;
    let (user, display) = user_and_display(config, args.user.as_deref(), args.display.as_deref());
    let resident = args.resident_key();

    let device = open_device(provider, &args.device.selector(), input, console.out())?;
    if resident && args.pin.as_deref().is_none_or(str::is_empty) {
        console.line("Resident passkey creation requires --pin.")?;
        return Ok(());
    }
    let mut backend = HidBackend::new(device, args.pin.clone());

    let user_id = challenges.bytes(CHALLENGE_LEN)?;
    let created = create_with(
        &mut backend,
        challenges,
        &NewCredential {
            rp_id,
            user_id: &user_id,
            user_name: &user,
            display_name: &display,
            resident_key: resident,
            timeout: config.creation_timeout,
        },
        config,
        "MakeCredential failed",
    )?;

    if console.is_json() {
        console.json(&KeyCredentialReport {
            backend: backend.name(),
            rp: rp_id.to_string(),
            user,
            resident,
            credential_id: to_hex(&created.credential.id),
            challenge_hex: to_hex(&created.challenge),
            challenge_b64: to_b64url(&created.challenge),
        })?;
        return Ok(());
    }

    console.line("Created passkey:")?;
    console.line(format!("  RP:            {rp_id}"))?;
    console.line(format!("  User:          {user}"))?;
    console.line(format!("  ResidentKey:   {resident}"))?;
    console.line(format!("  CredentialID:  {}", to_hex(&created.credential.id)))?;
    console.line(format!("  Challenge(hex): {}", to_hex(&created.challenge)))?;
    console.line(format!("  Challenge(b64): {}", to_b64url(&created.challenge)))?;
    Ok(())
}
