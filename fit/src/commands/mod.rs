//! One module per verb
//!
//! Commands are generic over where devices come from, where challenges
//! come from, and where output goes. Failures that end the run are
//! returned as `anyhow::Error` with the context line printed before the
//! cause; guarded early returns (a usage line, an empty credential list)
//! print and return `Ok`.

pub mod add_passkey;
pub mod auth;
pub mod hello;
pub mod info;
pub mod list;
pub mod reset;
pub mod set_pin;

use crate::backend::{AssertRequest, AssertionResult, Backend, CreateRequest, CreatedCredential};
use crate::challenge::ChallengeSource;
use crate::config::Config;
use crate::output::write_json;

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

/// Output sink for a command, aware of the output mode
pub struct Console<'a, W: Write> {
    pub config: &'a Config,
    out: &'a mut W,
}

impl<'a, W: Write> Console<'a, W> {
    pub fn new(config: &'a Config, out: &'a mut W) -> Self {
        Self { config, out }
    }

    pub fn is_json(&self) -> bool {
        self.config.is_json()
    }

    /// Printed in both modes
    pub fn line(&mut self, text: impl AsRef<str>) -> std::io::Result<()> {
        writeln!(self.out, "{}", text.as_ref())
    }

    /// Progress and choice notices; text mode only
    pub fn notice(&mut self, text: impl AsRef<str>) -> std::io::Result<()> {
        if self.is_json() {
            return Ok(());
        }
        self.line(text)
    }

    pub fn json<T: Serialize>(&mut self, report: &T) -> crate::Result<()> {
        write_json(&mut *self.out, report)
    }

    pub fn out(&mut self) -> &mut W {
        &mut *self.out
    }
}

/// Challenge and result of one assertion
pub struct Asserted {
    pub challenge: Vec<u8>,
    pub result: AssertionResult,
}

/// Draw a fresh challenge and request an assertion from `backend`
///
/// A backend failure is reported under `failure`.
pub fn assert_with<B, C>(
    backend: &mut B,
    challenges: &mut C,
    rp_id: &str,
    credential_id: Option<&[u8]>,
    config: &Config,
    failure: &'static str,
) -> anyhow::Result<Asserted>
where
    B: Backend,
    C: ChallengeSource,
{
    let challenge = challenges.bytes(config.challenge_len)?;
    let result = backend
        .get_assertion(&AssertRequest {
            rp_id,
            credential_id,
            challenge: &challenge,
            timeout: config.assertion_timeout,
        })
        .context(failure)?;
    Ok(Asserted { challenge, result })
}

/// Parameters of a credential creation that do not depend on the backend
pub struct NewCredential<'a> {
    pub rp_id: &'a str,
    pub user_id: &'a [u8],
    pub user_name: &'a str,
    pub display_name: &'a str,
    pub resident_key: bool,
    pub timeout: Duration,
}

pub struct Created {
    pub challenge: Vec<u8>,
    pub credential: CreatedCredential,
}

/// Draw a fresh challenge and create a credential on `backend`
pub fn create_with<B, C>(
    backend: &mut B,
    challenges: &mut C,
    request: &NewCredential<'_>,
    config: &Config,
    failure: &'static str,
) -> anyhow::Result<Created>
where
    B: Backend,
    C: ChallengeSource,
{
    let challenge = challenges.bytes(config.challenge_len)?;
    let credential = backend
        .make_credential(&CreateRequest {
            rp_id: request.rp_id,
            user_id: request.user_id,
            user_name: request.user_name,
            display_name: request.display_name,
            resident_key: request.resident_key,
            challenge: &challenge,
            timeout: request.timeout,
        })
        .context(failure)?;
    Ok(Created {
        challenge,
        credential,
    })
}

/// `--user` with its default, and `--display` defaulting to the user
pub fn user_and_display(
    config: &Config,
    user: Option<&str>,
    display: Option<&str>,
) -> (String, String) {
    let user = user
        .filter(|u| !u.is_empty())
        .unwrap_or(&config.default_user)
        .to_string();
    let display = display
        .filter(|d| !d.is_empty())
        .map_or_else(|| user.clone(), str::to_string);
    (user, display)
}
