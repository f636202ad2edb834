//! `fit-hello` verbs over a [`PlatformApi`]

use super::{Console, NewCredential, assert_with, create_with, user_and_display};
use crate::backend::Backend;
use crate::challenge::ChallengeSource;
use crate::cli::{
    DELETE_PASSKEY_USAGE, DeletePasskeyArgs, HELLO_ADD_PASSKEY_USAGE, HELLO_AUTH_USAGE,
    HelloAddPasskeyArgs, HelloAuthArgs, RpFilterArgs,
};
use crate::encoding::{to_b64url, to_hex};
use crate::hello::{Attachment, HelloBackend, PlatformApi, PlatformCredential};
use crate::output::{
    DeleteReport, HelloAssertionReport, HelloCredentialEntry, HelloCredentialReport,
    HelloListReport, HelloTestReport,
};
use crate::selection::Resolution;

use std::io::Write;

use anyhow::Context;
use tracing::warn;

/// Entries shown by `test` in text mode
pub const TEST_TEXT_LIMIT: usize = 5;
/// Entries included by `test` in JSON mode
pub const TEST_JSON_LIMIT: usize = 50;

fn rp_filter(rp: &Option<String>) -> Option<&str> {
    rp.as_deref().filter(|rp| !rp.is_empty())
}

fn credential_line(indent: &str, index: usize, c: &PlatformCredential) -> String {
    format!(
        "{indent}[{index}] RP={} User={} Removable={} BackedUp={} CredID(b64url)={}",
        c.rp_id,
        c.user_name,
        c.removable,
        c.backed_up,
        to_b64url(&c.id)
    )
}

fn credential_entry(index: Option<usize>, c: &PlatformCredential) -> HelloCredentialEntry {
    HelloCredentialEntry {
        index,
        rp: c.rp_id.clone(),
        user: c.user_name.clone(),
        removable: c.removable,
        backed_up: c.backed_up,
        cred_id: to_b64url(&c.id),
    }
}

pub fn list<P: PlatformApi, W: Write>(
    api: &P,
    args: &RpFilterArgs,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()> {
    let rp = rp_filter(&args.rp);
    let credentials = api.credentials(rp).context("PlatformCredentialList")?;

    if console.is_json() {
        console.json(&HelloListReport {
            backend: "hello",
            rp: rp.unwrap_or_default().to_string(),
            credentials: credentials
                .iter()
                .enumerate()
                .map(|(i, c)| credential_entry(Some(i), c))
                .collect(),
        })?;
        return Ok(());
    }

    if credentials.is_empty() {
        match rp {
            Some(rp) => console.line(format!("No credentials for RP '{rp}'"))?,
            None => console.line("No credentials found.")?,
        }
        return Ok(());
    }
    console.line("Windows Hello credentials:")?;
    for (i, c) in credentials.iter().enumerate() {
        console.line(credential_line("  ", i, c))?;
    }
    Ok(())
}

/// Platform diagnostics followed by a subset of the credentials
pub fn test<P: PlatformApi, W: Write>(
    api: &P,
    args: &RpFilterArgs,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()> {
    let rp = rp_filter(&args.rp);
    let credentials = api.credentials(rp).context("PlatformCredentialList")?;

    if console.is_json() {
        console.json(&HelloTestReport {
            backend: "hello",
            rp: rp.unwrap_or_default().to_string(),
            api_version: api.api_version(),
            credentials: credentials
                .iter()
                .take(TEST_JSON_LIMIT)
                .map(|c| credential_entry(None, c))
                .collect(),
        })?;
        return Ok(());
    }

    console.line("Windows Hello diagnostic:")?;
    console.line(format!("  API Version: {}", api.api_version()))?;
    match api.platform_authenticator_available() {
        Ok(available) => console.line(format!("  UVPA Available: {available}"))?,
        Err(e) => warn!("UVPA availability unknown: {e}"),
    }
    if let Some(rp) = rp {
        console.line(format!("  RP filter: {rp}"))?;
    }
    console.line(format!("  Credentials found: {}", credentials.len()))?;
    for (i, c) in credentials.iter().take(TEST_TEXT_LIMIT).enumerate() {
        console.line(credential_line("    ", i, c))?;
    }
    if credentials.len() > TEST_TEXT_LIMIT {
        console.line(format!(
            "    ... and {} more",
            credentials.len() - TEST_TEXT_LIMIT
        ))?;
    }
    Ok(())
}

/// Assertion through Windows Hello, or through the OS selector with `--device`
pub fn auth<P, C, W>(
    api: &mut P,
    challenges: &mut C,
    args: &HelloAuthArgs,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: PlatformApi,
    C: ChallengeSource,
    W: Write,
{
    let Some(rp_id) = rp_filter(&args.rp) else {
        console.line(HELLO_AUTH_USAGE)?;
        return Ok(());
    };
    let config = console.config;
    let mut backend = HelloBackend::new(api, Attachment::from_device_flag(args.device));

    let selector = args.credential.selector(args.device);
    let resolution = selector.resolve(|| {
        backend
            .enumerate_credentials(rp_id)
            .context("PlatformCredentialList")
    })?;
    let credential_id = match resolution {
        Resolution::NoCredentials => {
            console.line("No Windows Hello credentials found for RP.")?;
            return Ok(());
        }
        Resolution::First(id) => {
            console.notice("Using platform credential index 0")?;
            Some(id)
        }
        Resolution::Explicit(id) | Resolution::Indexed { id, .. } => Some(id),
        Resolution::PlatformSelector => None,
    };

    let asserted = assert_with(
        &mut backend,
        challenges,
        rp_id,
        credential_id.as_deref(),
        config,
        "GetAssertion",
    )?;
    let result = &asserted.result;

    if console.is_json() {
        console.json(&HelloAssertionReport {
            backend: backend.name(),
            rp: rp_id.to_string(),
            credential_id: to_b64url(&result.credential_id),
            signature: to_b64url(&result.signature),
            challenge_b64: to_b64url(&asserted.challenge),
            challenge_hex: to_hex(&asserted.challenge),
        })?;
        return Ok(());
    }

    console.line("Assertion result (Hello):")?;
    console.line(format!("  CredentialID(b64url): {}", to_b64url(&result.credential_id)))?;
    console.line(format!("  Sig(b64url):          {}", to_b64url(&result.signature)))?;
    console.line(format!("  Challenge(b64url):    {}", to_b64url(&asserted.challenge)))?;
    console.line(format!("  Challenge(hex):       {}", to_hex(&asserted.challenge)))?;
    Ok(())
}

pub fn add_passkey<P, C, W>(
    api: &mut P,
    challenges: &mut C,
    args: &HelloAddPasskeyArgs,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()>
where
    P: PlatformApi,
    C: ChallengeSource,
    W: Write,
{
    let Some(rp_id) = rp_filter(&args.rp) else {
        console.line(HELLO_ADD_PASSKEY_USAGE)?;
        return Ok(());
    };
    let config = console.config;
    let (user, display) = user_and_display(config, args.user.as_deref(), args.display.as_deref());

    let mut backend = HelloBackend::new(api, Attachment::from_device_flag(args.device));
    let created = create_with(
        &mut backend,
        challenges,
        &NewCredential {
            rp_id,
            user_id: &config.hello_user_id,
            user_name: &user,
            display_name: &display,
            resident_key: args.resident_key(),
            timeout: config.creation_timeout,
        },
        config,
        "MakeCredential",
    )?;
    let credential = &created.credential;

    if console.is_json() {
        console.json(&HelloCredentialReport {
            backend: backend.name(),
            rp: rp_id.to_string(),
            user,
            resident: credential.resident,
            credential_id: to_b64url(&credential.id),
            challenge_b64: to_b64url(&created.challenge),
            challenge_hex: to_hex(&created.challenge),
        })?;
        return Ok(());
    }

    console.line("Created passkey (Hello):")?;
    console.line(format!("  RP: {rp_id}"))?;
    console.line(format!("  User: {user}"))?;
    console.line(format!("  ResidentKey: {}", credential.resident))?;
    console.line(format!("  CredentialID(b64url): {}", to_b64url(&credential.id)))?;
    console.line(format!("  Challenge(b64url):    {}", to_b64url(&created.challenge)))?;
    console.line(format!("  Challenge(hex):       {}", to_hex(&created.challenge)))?;
    Ok(())
}

/// Delete one platform credential; an identifier flag is mandatory
pub fn delete_passkey<P: PlatformApi, W: Write>(
    api: &mut P,
    args: &DeletePasskeyArgs,
    console: &mut Console<'_, W>,
) -> anyhow::Result<()> {
    let selector = args.credential.selector(false);
    if selector.is_empty() {
        console.line(DELETE_PASSKEY_USAGE)?;
        return Ok(());
    }
    let rp = rp_filter(&args.rp).unwrap_or_default();
    let mut backend = HelloBackend::new(api, Attachment::Platform);

    let resolution = selector.resolve(|| {
        backend
            .enumerate_credentials(rp)
            .context("PlatformCredentialList")
    })?;
    let Some(credential_id) = resolution.credential_id().map(<[u8]>::to_vec) else {
        console.line(DELETE_PASSKEY_USAGE)?;
        return Ok(());
    };

    backend
        .delete_credential(&credential_id)
        .context("DeletePlatformCredential")?;

    if console.is_json() {
        console.json(&DeleteReport {
            backend: backend.name(),
            deleted: true,
            cred_id: to_b64url(&credential_id),
        })?;
    } else {
        console.line("Credential deleted.")?;
    }
    Ok(())
}
