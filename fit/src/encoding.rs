//! Text forms of binary values
//!
//! Security key output uses lowercase hex; Windows Hello output uses
//! base64url without padding. Both decoders trim surrounding whitespace
//! and are otherwise strict.

use crate::error::{Error, Result};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn to_b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a `--cred-id-hex` value
pub fn credential_id_from_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).map_err(|e| Error::InvalidCredentialId {
        flag: "--cred-id-hex",
        reason: e.to_string(),
    })
}

/// Decode a `--cred-id-b64` value
pub fn credential_id_from_b64url(value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim())
        .map_err(|e| Error::InvalidCredentialId {
            flag: "--cred-id-b64",
            reason: e.to_string(),
        })
}
