//! authenticatorGetAssertion request and response
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorGetAssertion>

use crate::cbor::{self, MapBuilder, MapParser};
use crate::error::Result;
use crate::types::{PublicKeyCredentialDescriptor, RequestOptions, User};

use fit_crypto::PinUvAuthProtocol;

mod req_keys {
    pub const RP_ID: i32 = 0x01;
    pub const CLIENT_DATA_HASH: i32 = 0x02;
    pub const ALLOW_LIST: i32 = 0x03;
    pub const OPTIONS: i32 = 0x05;
    pub const PIN_UV_AUTH_PARAM: i32 = 0x06;
    pub const PIN_UV_AUTH_PROTOCOL: i32 = 0x07;
}

mod resp_keys {
    pub const CREDENTIAL: i32 = 0x01;
    pub const AUTH_DATA: i32 = 0x02;
    pub const SIGNATURE: i32 = 0x03;
    pub const USER: i32 = 0x04;
    pub const NUMBER_OF_CREDENTIALS: i32 = 0x05;
}

#[derive(Debug, Clone)]
pub struct GetAssertionRequest {
    pub rp_id: String,
    pub client_data_hash: Vec<u8>,
    pub allow_list: Vec<PublicKeyCredentialDescriptor>,
    pub user_presence: bool,
    pub pin_uv_auth: Option<(Vec<u8>, PinUvAuthProtocol)>,
}

impl GetAssertionRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut builder = MapBuilder::new()
            .insert(req_keys::RP_ID, &self.rp_id)?
            .insert_bytes(req_keys::CLIENT_DATA_HASH, &self.client_data_hash)?;
        if !self.allow_list.is_empty() {
            builder = builder.insert(req_keys::ALLOW_LIST, &self.allow_list)?;
        }
        builder = builder.insert(
            req_keys::OPTIONS,
            RequestOptions {
                up: Some(self.user_presence),
                ..Default::default()
            },
        )?;
        if let Some((param, protocol)) = &self.pin_uv_auth {
            builder = builder
                .insert_bytes(req_keys::PIN_UV_AUTH_PARAM, param)?
                .insert(req_keys::PIN_UV_AUTH_PROTOCOL, protocol.as_u8())?;
        }
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// May be absent when the allowList had exactly one entry
    pub credential: Option<PublicKeyCredentialDescriptor>,
    pub auth_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user: Option<User>,
    pub number_of_credentials: Option<u32>,
}

impl Assertion {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?;
        Ok(Self {
            credential: parser.get_opt(resp_keys::CREDENTIAL)?,
            auth_data: parser.get_bytes(resp_keys::AUTH_DATA)?,
            signature: parser.get_bytes(resp_keys::SIGNATURE)?,
            user: parser.get_opt(resp_keys::USER)?,
            number_of_credentials: parser.get_opt(resp_keys::NUMBER_OF_CREDENTIALS)?,
        })
    }

    /// Credential that signed, falling back to the single allowList entry
    pub fn credential_id<'a>(&'a self, requested: &'a [u8]) -> &'a [u8] {
        self.credential
            .as_ref()
            .map(|c| c.id.as_slice())
            .unwrap_or(requested)
    }

    /// authenticatorData wrapped as a CBOR byte string
    pub fn auth_data_cbor(&self) -> Result<Vec<u8>> {
        cbor::encode(&serde_bytes::Bytes::new(&self.auth_data))
    }
}
