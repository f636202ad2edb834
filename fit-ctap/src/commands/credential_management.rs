//! authenticatorCredentialManagement requests and responses
//!
//! Only the subcommands the tool uses are modelled: metadata, credential
//! enumeration for one RP, and deletion.
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorCredentialManagement>

use crate::cbor::{MapBuilder, MapParser};
use crate::error::Result;
use crate::types::{PublicKeyCredentialDescriptor, User};

use fit_crypto::PinUvAuthProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubCommand {
    GetCredsMetadata = 0x01,
    EnumerateCredentialsBegin = 0x04,
    EnumerateCredentialsGetNextCredential = 0x05,
    DeleteCredential = 0x06,
}

impl SubCommand {
    /// Subcommands that carry a pinUvAuthParam
    fn is_authenticated(self) -> bool {
        self != Self::EnumerateCredentialsGetNextCredential
    }
}

mod req_keys {
    pub const SUBCOMMAND: i32 = 0x01;
    pub const SUBCOMMAND_PARAMS: i32 = 0x02;
    pub const PIN_UV_AUTH_PROTOCOL: i32 = 0x03;
    pub const PIN_UV_AUTH_PARAM: i32 = 0x04;
}

mod resp_keys {
    pub const EXISTING_RESIDENT_CREDENTIALS_COUNT: i32 = 0x01;
    pub const MAX_POSSIBLE_REMAINING_RESIDENT_CREDENTIALS_COUNT: i32 = 0x02;
    pub const USER: i32 = 0x06;
    pub const CREDENTIAL_ID: i32 = 0x07;
    pub const TOTAL_CREDENTIALS: i32 = 0x09;
}

mod subparam_keys {
    pub const RP_ID_HASH: i32 = 0x01;
    pub const CREDENTIAL_ID: i32 = 0x02;
}

/// subCommandParams map for a subcommand, if it takes any
pub fn sub_command_params(
    rp_id_hash: Option<&[u8; 32]>,
    credential: Option<&PublicKeyCredentialDescriptor>,
) -> Result<Option<Vec<u8>>> {
    if rp_id_hash.is_none() && credential.is_none() {
        return Ok(None);
    }
    let mut builder = MapBuilder::new();
    if let Some(hash) = rp_id_hash {
        builder = builder.insert_bytes(subparam_keys::RP_ID_HASH, hash)?;
    }
    builder = builder.insert_opt(subparam_keys::CREDENTIAL_ID, credential)?;
    builder.build().map(Some)
}

/// Message covered by the pinUvAuthParam: subCommand || subCommandParams
pub fn auth_message(sub_command: SubCommand, params: Option<&[u8]>) -> Vec<u8> {
    let mut message = vec![sub_command as u8];
    message.extend_from_slice(params.unwrap_or_default());
    message
}

/// Encode a request
///
/// `pin_uv_auth` is the token-keyed MAC over [`auth_message`]; it is ignored
/// for getNextCredential, which the authenticator ties to the prior call.
pub fn encode_request(
    sub_command: SubCommand,
    params: Option<&[u8]>,
    pin_uv_auth: Option<(&[u8], PinUvAuthProtocol)>,
) -> Result<Vec<u8>> {
    let mut builder = MapBuilder::new().insert(req_keys::SUBCOMMAND, sub_command as u8)?;
    if let Some(params) = params {
        builder = builder.insert_raw(req_keys::SUBCOMMAND_PARAMS, params.to_vec())?;
    }
    if sub_command.is_authenticated()
        && let Some((param, protocol)) = pin_uv_auth
    {
        builder = builder
            .insert(req_keys::PIN_UV_AUTH_PROTOCOL, protocol.as_u8())?
            .insert_bytes(req_keys::PIN_UV_AUTH_PARAM, param)?;
    }
    builder.build()
}

/// Resident credential counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialsMetadata {
    pub existing: u32,
    pub remaining: u32,
}

impl CredentialsMetadata {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?;
        Ok(Self {
            existing: parser.get(resp_keys::EXISTING_RESIDENT_CREDENTIALS_COUNT)?,
            remaining: parser.get(resp_keys::MAX_POSSIBLE_REMAINING_RESIDENT_CREDENTIALS_COUNT)?,
        })
    }
}

/// A discoverable credential stored on the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentCredential {
    pub credential: PublicKeyCredentialDescriptor,
    pub user: User,
}

/// One enumerateCredentials response
///
/// `total` is only present on the Begin response.
pub fn parse_credential(data: &[u8]) -> Result<(ResidentCredential, Option<u32>)> {
    let parser = MapParser::from_bytes(data)?;
    let credential = ResidentCredential {
        credential: parser.get(resp_keys::CREDENTIAL_ID)?,
        user: parser.get(resp_keys::USER)?,
    };
    Ok((credential, parser.get_opt(resp_keys::TOTAL_CREDENTIALS)?))
}
