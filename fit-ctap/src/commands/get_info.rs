//! authenticatorGetInfo response
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorGetInfo>

use crate::cbor::MapParser;
use crate::error::Result;

use fit_crypto::PinUvAuthProtocol;

use std::collections::BTreeMap;

mod keys {
    pub const VERSIONS: i32 = 0x01;
    pub const EXTENSIONS: i32 = 0x02;
    pub const AAGUID: i32 = 0x03;
    pub const OPTIONS: i32 = 0x04;
    pub const MAX_MSG_SIZE: i32 = 0x05;
    pub const PIN_UV_AUTH_PROTOCOLS: i32 = 0x06;
    pub const MIN_PIN_LENGTH: i32 = 0x0D;
    pub const FIRMWARE_VERSION: i32 = 0x0E;
    pub const REMAINING_DISCOVERABLE_CREDENTIALS: i32 = 0x14;
}

/// What the authenticator reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticatorInfo {
    /// e.g. `FIDO_2_0`, `FIDO_2_1`, `U2F_V2`
    pub versions: Vec<String>,
    pub extensions: Vec<String>,
    pub aaguid: Vec<u8>,
    /// Option name to value, sorted by name
    pub options: BTreeMap<String, bool>,
    pub max_msg_size: Option<u64>,
    pub pin_uv_auth_protocols: Vec<u8>,
    pub min_pin_length: Option<u64>,
    pub firmware_version: Option<u64>,
    pub remaining_discoverable_credentials: Option<u64>,
}

impl AuthenticatorInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?;
        Ok(Self {
            versions: parser.get(keys::VERSIONS)?,
            extensions: parser.get_opt(keys::EXTENSIONS)?.unwrap_or_default(),
            aaguid: parser.get_bytes(keys::AAGUID)?,
            options: parser.get_opt(keys::OPTIONS)?.unwrap_or_default(),
            max_msg_size: parser.get_opt(keys::MAX_MSG_SIZE)?,
            pin_uv_auth_protocols: parser
                .get_opt(keys::PIN_UV_AUTH_PROTOCOLS)?
                .unwrap_or_default(),
            min_pin_length: parser.get_opt(keys::MIN_PIN_LENGTH)?,
            firmware_version: parser.get_opt(keys::FIRMWARE_VERSION)?,
            remaining_discoverable_credentials: parser
                .get_opt(keys::REMAINING_DISCOVERABLE_CREDENTIALS)?,
        })
    }

    /// `Some(value)` when the option is present at all
    pub fn option(&self, name: &str) -> Option<bool> {
        self.options.get(name).copied()
    }

    pub fn is_fido2(&self) -> bool {
        self.versions.iter().any(|v| v.starts_with("FIDO_2"))
    }

    /// Newest PIN/UV auth protocol both sides speak
    ///
    /// Authenticators that list nothing are assumed to speak protocol one.
    pub fn preferred_pin_protocol(&self) -> PinUvAuthProtocol {
        if self.pin_uv_auth_protocols.contains(&2) {
            PinUvAuthProtocol::Two
        } else {
            PinUvAuthProtocol::One
        }
    }

    /// CTAP 2.1 permission-scoped tokens (clientPin subcommand 0x09)
    pub fn supports_permissions(&self) -> bool {
        self.option("pinUvAuthToken") == Some(true)
    }

    /// Whether credential management is available, and under which command
    pub fn credential_management(&self) -> Option<CredentialManagementVersion> {
        if self.option("credMgmt") == Some(true) {
            Some(CredentialManagementVersion::Standard)
        } else if self.option("credentialMgmtPreview") == Some(true) {
            Some(CredentialManagementVersion::Preview)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialManagementVersion {
    Standard,
    Preview,
}
