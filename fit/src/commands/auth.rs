//! `fit auth`: challenge/response against a security key

use super::{Console, NewCredential, assert_with, create_with};
use crate::backend::Backend;
use crate::challenge::{CHALLENGE_LEN, ChallengeSource};
use crate::cli::{AUTH_USAGE, AuthArgs};
use crate::encoding::{to_b64url, to_hex};
use crate::hid::{DeviceProvider, HidBackend, open_device};
use crate::output::KeyAssertionReport;
use crate::selection::Resolution;

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::debug;

/// Only ES256 credentials are created
const CREDENTIAL_TYPE: &str = "es256";

pub fn run<P, C, R, W>(
    provider: &P,
    challenges: &mut C,
    args: &AuthArgs,
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
        console.line(AUTH_USAGE)?;
        return Ok(());
    };
    let config = console.config;
    let selector = args.credential.selector(false);

    let device = open_device(provider, &args.device.selector(), input, console.out())?;
    let mut backend = HidBackend::new(device, args.pin.clone());

    let credential_id = if let Some(id) = selector.explicit_id()? {
        id
    } else if args.create {
        if args.pin.as_deref().is_none_or(str::is_empty) {
            console.line("--create requires --pin to be provided.")?;
            return Ok(());
        }
        let user_id = challenges.bytes(CHALLENGE_LEN)?;
        let created = create_with(
            &mut backend,
            challenges,
            &NewCredential {
                rp_id,
                user_id: &user_id,
                user_name: &config.default_user,
                display_name: &config.default_user,
                resident_key: config.transient_resident_key,
                timeout: config.creation_timeout,
            },
            config,
            "MakeCredential failed",
        )?;
        console.notice(format!(
            "Created transient credential: ID={} Type={}",
            to_hex(&created.credential.id),
            CREDENTIAL_TYPE
        ))?;
        created.credential.id
    } else {
        let resolution = selector.resolve(|| {
            backend
                .enumerate_credentials(rp_id)
                .with_context(|| format!("Credentials({rp_id}) failed"))
        })?;
        match resolution {
            Resolution::Indexed { index, id } => {
                console.notice(format!(
                    "Using resident credential index {} (len={})",
                    index,
                    id.len()
                ))?;
                id
            }
            Resolution::First(id) => {
                console.notice(format!("Using resident credential index 0 (len={})", id.len()))?;
                id
            }
            Resolution::Explicit(id) => id,
            Resolution::NoCredentials | Resolution::PlatformSelector => {
                console.line("No resident credentials found for RP.")?;
                return Ok(());
            }
        }
    };
    debug!(rp = rp_id, len = credential_id.len(), "asserting");

    let asserted = assert_with(
        &mut backend,
        challenges,
        rp_id,
        Some(credential_id.as_slice()),
        config,
        "Assertion failed",
    )?;
    let result = &asserted.result;

    if console.is_json() {
        console.json(&KeyAssertionReport {
            backend: backend.name(),
            rp: rp_id.to_string(),
            credential_id: to_hex(&result.credential_id),
            signature: to_hex(&result.signature),
            challenge_hex: to_hex(&asserted.challenge),
            challenge_b64: to_b64url(&asserted.challenge),
            auth_data_cbor: Some(&result.auth_data)
                .filter(|data| !data.is_empty())
                .map(|data| to_hex(data)),
        })?;
        return Ok(());
    }

    console.line("Assertion result:")?;
    console.line(format!("  CredentialID: {}", to_hex(&result.credential_id)))?;
    console.line(format!("  Sig:          {}", to_hex(&result.signature)))?;
    console.line(format!("  Challenge(hex): {}", to_hex(&asserted.challenge)))?;
    console.line(format!("  Challenge(b64): {}", to_b64url(&asserted.challenge)))?;
    if !result.auth_data.is_empty() {
        console.line(format!("  AuthDataCBOR: {}", to_hex(&result.auth_data)))?;
    }
    Ok(())
}
