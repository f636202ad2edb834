//! authenticatorClientPIN requests and responses
//!
//! Covers the subcommands a platform needs to read retries, establish a
//! shared secret, set or change the PIN, and obtain a pinUvAuthToken.
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorClientPIN>

use crate::cbor::{MapBuilder, MapParser, Value};
use crate::error::{Error, Result};

use fit_crypto::PinUvAuthProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubCommand {
    GetPinRetries = 0x01,
    GetKeyAgreement = 0x02,
    SetPin = 0x03,
    ChangePin = 0x04,
    GetPinToken = 0x05,
    GetPinUvAuthTokenUsingPinWithPermissions = 0x09,
}

mod req_keys {
    pub const PIN_UV_AUTH_PROTOCOL: i32 = 0x01;
    pub const SUBCOMMAND: i32 = 0x02;
    pub const KEY_AGREEMENT: i32 = 0x03;
    pub const PIN_UV_AUTH_PARAM: i32 = 0x04;
    pub const NEW_PIN_ENC: i32 = 0x05;
    pub const PIN_HASH_ENC: i32 = 0x06;
    pub const PERMISSIONS: i32 = 0x09;
    pub const RP_ID: i32 = 0x0A;
}

mod resp_keys {
    pub const KEY_AGREEMENT: i32 = 0x01;
    pub const PIN_UV_AUTH_TOKEN: i32 = 0x02;
    pub const PIN_RETRIES: i32 = 0x03;
    pub const POWER_CYCLE_STATE: i32 = 0x04;
}

/// COSE_Key labels for an EC2 key
mod cose {
    pub const KTY: i32 = 1;
    pub const ALG: i32 = 3;
    pub const CRV: i32 = -1;
    pub const X: i32 = -2;
    pub const Y: i32 = -3;

    pub const KTY_EC2: i32 = 2;
    /// ECDH-ES + HKDF-256, the value CTAP mandates for key agreement keys
    pub const ALG_ECDH_ES_HKDF_256: i32 = -25;
    pub const CRV_P256: i32 = 1;
}

/// pinUvAuthToken permission bits
pub mod permissions {
    pub const MAKE_CREDENTIAL: u8 = 0x01;
    pub const GET_ASSERTION: u8 = 0x02;
    pub const CREDENTIAL_MANAGEMENT: u8 = 0x04;
}

/// Encode a P-256 public key as a COSE_Key map
pub fn cose_key(x: &[u8; 32], y: &[u8; 32]) -> Result<Vec<u8>> {
    MapBuilder::new()
        .insert(cose::KTY, cose::KTY_EC2)?
        .insert(cose::ALG, cose::ALG_ECDH_ES_HKDF_256)?
        .insert(cose::CRV, cose::CRV_P256)?
        .insert_bytes(cose::X, x)?
        .insert_bytes(cose::Y, y)?
        .build()
}

/// Pull the x and y coordinates out of a decoded COSE_Key
pub fn parse_cose_key(value: &Value) -> Result<(Vec<u8>, Vec<u8>)> {
    let Value::Map(entries) = value else {
        return Err(Error::Malformed("keyAgreement is not a map".into()));
    };

    let mut x = None;
    let mut y = None;
    for (label, value) in entries {
        match (label, value) {
            (Value::Integer(l), Value::Bytes(b)) if *l == cose::X as i128 => x = Some(b.clone()),
            (Value::Integer(l), Value::Bytes(b)) if *l == cose::Y as i128 => y = Some(b.clone()),
            _ => {}
        }
    }

    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(Error::Malformed("keyAgreement lacks coordinates".into())),
    }
}

/// One clientPIN request; unset fields are omitted from the map
#[derive(Debug, Clone)]
pub struct ClientPinRequest {
    pub protocol: PinUvAuthProtocol,
    pub sub_command: SubCommand,
    /// Platform COSE_Key, already encoded
    pub key_agreement: Option<Vec<u8>>,
    pub pin_uv_auth_param: Option<Vec<u8>>,
    pub new_pin_enc: Option<Vec<u8>>,
    pub pin_hash_enc: Option<Vec<u8>>,
    pub permissions: Option<u8>,
    pub rp_id: Option<String>,
}

impl ClientPinRequest {
    pub fn new(protocol: PinUvAuthProtocol, sub_command: SubCommand) -> Self {
        Self {
            protocol,
            sub_command,
            key_agreement: None,
            pin_uv_auth_param: None,
            new_pin_enc: None,
            pin_hash_enc: None,
            permissions: None,
            rp_id: None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut builder = MapBuilder::new()
            .insert(req_keys::PIN_UV_AUTH_PROTOCOL, self.protocol.as_u8())?
            .insert(req_keys::SUBCOMMAND, self.sub_command as u8)?;
        if let Some(key) = &self.key_agreement {
            builder = builder.insert_raw(req_keys::KEY_AGREEMENT, key.clone())?;
        }
        if let Some(param) = &self.pin_uv_auth_param {
            builder = builder.insert_bytes(req_keys::PIN_UV_AUTH_PARAM, param)?;
        }
        if let Some(enc) = &self.new_pin_enc {
            builder = builder.insert_bytes(req_keys::NEW_PIN_ENC, enc)?;
        }
        if let Some(enc) = &self.pin_hash_enc {
            builder = builder.insert_bytes(req_keys::PIN_HASH_ENC, enc)?;
        }
        builder = builder
            .insert_opt(req_keys::PERMISSIONS, self.permissions)?
            .insert_opt(req_keys::RP_ID, self.rp_id.as_deref())?;
        builder.build()
    }
}

/// Retries left before the PIN blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRetries {
    pub retries: u32,
    /// A power cycle is needed before the next attempt
    pub power_cycle_required: bool,
}

impl PinRetries {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?;
        Ok(Self {
            retries: parser.get(resp_keys::PIN_RETRIES)?,
            power_cycle_required: parser
                .get_opt(resp_keys::POWER_CYCLE_STATE)?
                .unwrap_or(false),
        })
    }
}

/// The authenticator's key agreement public key as (x, y)
pub fn parse_key_agreement(data: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let parser = MapParser::from_bytes(data)?;
    let key = parser
        .value(resp_keys::KEY_AGREEMENT)
        .ok_or_else(|| Error::Malformed("missing keyAgreement".into()))?;
    parse_cose_key(key)
}

/// Encrypted pinUvAuthToken
pub fn parse_token(data: &[u8]) -> Result<Vec<u8>> {
    MapParser::from_bytes(data)?.get_bytes(resp_keys::PIN_UV_AUTH_TOKEN)
}
