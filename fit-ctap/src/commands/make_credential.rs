//! authenticatorMakeCredential request and response
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorMakeCredential>

use crate::cbor::{MapBuilder, MapParser};
use crate::error::{Error, Result};
use crate::types::{PublicKeyCredentialParameters, RelyingParty, RequestOptions, User};

use fit_crypto::PinUvAuthProtocol;

mod req_keys {
    pub const CLIENT_DATA_HASH: i32 = 0x01;
    pub const RP: i32 = 0x02;
    pub const USER: i32 = 0x03;
    pub const PUB_KEY_CRED_PARAMS: i32 = 0x04;
    pub const OPTIONS: i32 = 0x07;
    pub const PIN_UV_AUTH_PARAM: i32 = 0x08;
    pub const PIN_UV_AUTH_PROTOCOL: i32 = 0x09;
}

mod resp_keys {
    pub const FMT: i32 = 0x01;
    pub const AUTH_DATA: i32 = 0x02;
}

/// authenticatorData flag bits
pub mod flags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;
}

#[derive(Debug, Clone)]
pub struct MakeCredentialRequest {
    pub client_data_hash: Vec<u8>,
    pub rp: RelyingParty,
    pub user: User,
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    pub resident_key: bool,
    /// pinUvAuthParam and the protocol that produced it
    pub pin_uv_auth: Option<(Vec<u8>, PinUvAuthProtocol)>,
}

impl MakeCredentialRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let options = RequestOptions {
            rk: self.resident_key.then_some(true),
            ..Default::default()
        };

        let mut builder = MapBuilder::new()
            .insert_bytes(req_keys::CLIENT_DATA_HASH, &self.client_data_hash)?
            .insert(req_keys::RP, &self.rp)?
            .insert(req_keys::USER, &self.user)?
            .insert(req_keys::PUB_KEY_CRED_PARAMS, &self.pub_key_cred_params)?;
        if !options.is_empty() {
            builder = builder.insert(req_keys::OPTIONS, &options)?;
        }
        if let Some((param, protocol)) = &self.pin_uv_auth {
            builder = builder
                .insert_bytes(req_keys::PIN_UV_AUTH_PARAM, param)?
                .insert(req_keys::PIN_UV_AUTH_PROTOCOL, protocol.as_u8())?;
        }
        builder.build()
    }
}

/// Parsed authenticatorData
///
/// Layout: rpIdHash (32) | flags (1) | signCount (4, big endian) |
/// [aaguid (16) | credentialIdLength (2) | credentialId | publicKey]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub aaguid: Option<[u8; 16]>,
    pub credential_id: Option<Vec<u8>>,
}

impl AuthenticatorData {
    const HEADER_LEN: usize = 32 + 1 + 4;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_LEN {
            return Err(Error::Malformed(format!(
                "authenticator data is {} bytes",
                data.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&data[..32]);
        let flags = data[32];
        let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        let mut parsed = Self {
            rp_id_hash,
            flags,
            sign_count,
            aaguid: None,
            credential_id: None,
        };
        if flags & flags::ATTESTED_CREDENTIAL_DATA == 0 {
            return Ok(parsed);
        }

        let rest = &data[Self::HEADER_LEN..];
        if rest.len() < 18 {
            return Err(Error::Malformed("truncated attested credential data".into()));
        }
        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&rest[..16]);
        let id_len = u16::from_be_bytes([rest[16], rest[17]]) as usize;
        let id = rest
            .get(18..18 + id_len)
            .ok_or_else(|| Error::Malformed("credential ID overruns authenticator data".into()))?;

        parsed.aaguid = Some(aaguid);
        parsed.credential_id = Some(id.to_vec());
        Ok(parsed)
    }

    pub fn user_present(&self) -> bool {
        self.flags & flags::USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & flags::USER_VERIFIED != 0
    }
}

/// Attestation object returned by makeCredential
#[derive(Debug, Clone)]
pub struct Attestation {
    /// Attestation statement format, e.g. `packed`
    pub fmt: String,
    pub auth_data_raw: Vec<u8>,
    pub auth_data: AuthenticatorData,
}

impl Attestation {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?;
        let auth_data_raw = parser.get_bytes(resp_keys::AUTH_DATA)?;
        let auth_data = AuthenticatorData::parse(&auth_data_raw)?;
        if auth_data.credential_id.is_none() {
            return Err(Error::Malformed(
                "makeCredential response has no attested credential".into(),
            ));
        }
        Ok(Self {
            fmt: parser.get(resp_keys::FMT)?,
            auth_data_raw,
            auth_data,
        })
    }

    pub fn credential_id(&self) -> &[u8] {
        self.auth_data.credential_id.as_deref().unwrap_or_default()
    }
}
