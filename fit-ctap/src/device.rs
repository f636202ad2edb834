//! CTAP2 session with one authenticator
//!
//! [`Device`] owns an allocated CTAPHID channel and runs complete platform
//! operations on it: PIN protocol negotiation, key agreement, token
//! acquisition, credential creation, assertions, and credential management.
//! The device handle is released when the session is dropped.

use crate::commands::CommandCode;
use crate::commands::client_pin::{
    self, ClientPinRequest, PinRetries, SubCommand as PinSubCommand, permissions,
};
use crate::commands::credential_management::{
    self as cred_mgmt, CredentialsMetadata, ResidentCredential, SubCommand as CredSubCommand,
};
use crate::commands::get_assertion::{Assertion, GetAssertionRequest};
use crate::commands::get_info::{AuthenticatorInfo, CredentialManagementVersion};
use crate::commands::make_credential::{Attestation, MakeCredentialRequest};
use crate::error::{Error, Result};
use crate::status::StatusCode;
use crate::types::{
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters, RelyingParty, User,
};

use fit_crypto::ecdh::KeyPair;
use fit_crypto::pin_protocol::{pad_pin, pin_hash};
use fit_crypto::{PinUvAuthProtocol, SharedSecret};
use fit_transport::{Channel, HidIo, InitResponse};

use std::time::Duration;

use sha2::{Digest, Sha256};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

/// Timeout for commands that never wait for the user
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for commands that may wait for a touch
pub const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the list allocated up front from totalCredentials
const MAX_PREALLOCATED_CREDENTIALS: usize = 64;

/// pinUvAuthToken decrypted from the authenticator
pub struct PinToken {
    token: Zeroizing<Vec<u8>>,
    protocol: PinUvAuthProtocol,
}

impl PinToken {
    pub fn protocol(&self) -> PinUvAuthProtocol {
        self.protocol
    }

    /// pinUvAuthParam over `message`
    pub fn authenticate(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.protocol.authenticate(&self.token, message)?)
    }
}

/// Parameters for a new credential
#[derive(Debug, Clone)]
pub struct CredentialOptions<'a> {
    pub rp_id: &'a str,
    pub user: User,
    pub resident_key: bool,
    pub client_data_hash: &'a [u8],
}

/// Open CTAP2 session on a CTAPHID channel
pub struct Device<D: HidIo> {
    channel: Channel<D>,
    info: Option<AuthenticatorInfo>,
}

impl<D: HidIo> Device<D> {
    /// Allocate a channel on `io`
    pub fn open(io: D) -> Result<Self> {
        Ok(Self {
            channel: Channel::open(io)?,
            info: None,
        })
    }

    /// Version and capabilities reported by CTAPHID_INIT
    pub fn hid_info(&self) -> &InitResponse {
        self.channel.info()
    }

    /// Send a CTAP2 command and strip the status byte
    fn call(&mut self, cmd: CommandCode, params: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let mut payload: SmallVec<[u8; 256]> = SmallVec::with_capacity(1 + params.len());
        payload.push(cmd as u8);
        payload.extend_from_slice(params);

        trace!(?cmd, len = params.len(), "ctap request");
        let response = self.channel.cbor(&payload, timeout)?;
        let (&status, body) = response
            .split_first()
            .ok_or_else(|| Error::Malformed("empty CTAP response".into()))?;

        let status = StatusCode::from_u8(status);
        if !status.is_success() {
            debug!(?cmd, %status, "ctap command failed");
            return Err(Error::Status(status));
        }
        trace!(?cmd, len = body.len(), "ctap response");
        Ok(body.to_vec())
    }

    /// authenticatorGetInfo, cached for the session
    pub fn get_info(&mut self) -> Result<AuthenticatorInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let response = self.call(CommandCode::GetInfo, &[], COMMAND_TIMEOUT)?;
        let info = AuthenticatorInfo::parse(&response)?;
        debug!(versions = ?info.versions, options = ?info.options, "authenticator info");
        self.info = Some(info.clone());
        Ok(info)
    }

    fn pin_protocol(&mut self) -> Result<PinUvAuthProtocol> {
        let info = self.get_info()?;
        if info.option("clientPin").is_none() {
            return Err(Error::Unsupported("clientPin"));
        }
        Ok(info.preferred_pin_protocol())
    }

    fn client_pin(&mut self, request: &ClientPinRequest, timeout: Duration) -> Result<Vec<u8>> {
        self.call(CommandCode::ClientPin, &request.encode()?, timeout)
    }

    /// Run getKeyAgreement and ECDH
    ///
    /// Returns the shared secret and the platform COSE key to send back.
    fn key_agreement(&mut self, protocol: PinUvAuthProtocol) -> Result<(SharedSecret, Vec<u8>)> {
        let request = ClientPinRequest::new(protocol, PinSubCommand::GetKeyAgreement);
        let response = self.client_pin(&request, COMMAND_TIMEOUT)?;
        let (x, y) = client_pin::parse_key_agreement(&response)?;

        let platform = KeyPair::generate();
        let z = platform.shared_secret_cose(&x, &y)?;
        let (px, py) = platform.public_key_cose();
        Ok((protocol.shared_secret(&z)?, client_pin::cose_key(&px, &py)?))
    }

    /// PIN attempts left
    pub fn pin_retries(&mut self) -> Result<u32> {
        let protocol = self.pin_protocol()?;
        let request = ClientPinRequest::new(protocol, PinSubCommand::GetPinRetries);
        let response = self.client_pin(&request, COMMAND_TIMEOUT)?;
        Ok(PinRetries::parse(&response)?.retries)
    }

    /// Set the first PIN on an authenticator that has none
    pub fn set_pin(&mut self, new_pin: &str) -> Result<()> {
        let protocol = self.pin_protocol()?;
        let padded = pad_pin(new_pin).ok_or(Error::PinTooLong)?;
        let (secret, key) = self.key_agreement(protocol)?;

        let new_pin_enc = secret.encrypt(&padded)?;
        let mut request = ClientPinRequest::new(protocol, PinSubCommand::SetPin);
        request.pin_uv_auth_param = Some(secret.authenticate(&new_pin_enc)?);
        request.key_agreement = Some(key);
        request.new_pin_enc = Some(new_pin_enc);

        self.client_pin(&request, INTERACTIVE_TIMEOUT)?;
        self.info = None;
        Ok(())
    }

    /// Replace an existing PIN
    pub fn change_pin(&mut self, old_pin: &str, new_pin: &str) -> Result<()> {
        let protocol = self.pin_protocol()?;
        let padded = pad_pin(new_pin).ok_or(Error::PinTooLong)?;
        let (secret, key) = self.key_agreement(protocol)?;

        let new_pin_enc = secret.encrypt(&padded)?;
        let pin_hash_enc = secret.encrypt(&pin_hash(old_pin))?;
        let mut message = new_pin_enc.clone();
        message.extend_from_slice(&pin_hash_enc);

        let mut request = ClientPinRequest::new(protocol, PinSubCommand::ChangePin);
        request.pin_uv_auth_param = Some(secret.authenticate(&message)?);
        request.key_agreement = Some(key);
        request.new_pin_enc = Some(new_pin_enc);
        request.pin_hash_enc = Some(pin_hash_enc);

        self.client_pin(&request, INTERACTIVE_TIMEOUT)?;
        self.info = None;
        Ok(())
    }

    /// Exchange the PIN for a pinUvAuthToken
    ///
    /// Authenticators that advertise `pinUvAuthToken` get a token scoped to
    /// `permissions` (and `rp_id` when given); older ones get a legacy token.
    pub fn pin_uv_auth_token(
        &mut self,
        pin: &str,
        permissions: u8,
        rp_id: Option<&str>,
    ) -> Result<PinToken> {
        let protocol = self.pin_protocol()?;
        let scoped = self.get_info()?.supports_permissions();
        let (secret, key) = self.key_agreement(protocol)?;

        let mut request = if scoped {
            let mut request = ClientPinRequest::new(
                protocol,
                PinSubCommand::GetPinUvAuthTokenUsingPinWithPermissions,
            );
            request.permissions = Some(permissions);
            request.rp_id = rp_id.map(str::to_owned);
            request
        } else {
            ClientPinRequest::new(protocol, PinSubCommand::GetPinToken)
        };
        request.key_agreement = Some(key);
        request.pin_hash_enc = Some(secret.encrypt(&pin_hash(pin))?);

        let response = self.client_pin(&request, COMMAND_TIMEOUT)?;
        let token = secret.decrypt(&client_pin::parse_token(&response)?)?;
        debug!(protocol = protocol.as_u8(), scoped, "obtained pinUvAuthToken");
        Ok(PinToken {
            token: Zeroizing::new(token),
            protocol,
        })
    }

    fn pin_uv_auth(
        &mut self,
        pin: Option<&str>,
        permissions: u8,
        rp_id: &str,
        client_data_hash: &[u8],
    ) -> Result<Option<(Vec<u8>, PinUvAuthProtocol)>> {
        let Some(pin) = pin else {
            return Ok(None);
        };
        let token = self.pin_uv_auth_token(pin, permissions, Some(rp_id))?;
        Ok(Some((token.authenticate(client_data_hash)?, token.protocol())))
    }

    /// authenticatorMakeCredential with ES256
    pub fn make_credential(
        &mut self,
        options: CredentialOptions<'_>,
        pin: Option<&str>,
        timeout: Duration,
    ) -> Result<Attestation> {
        let pin_uv_auth = self.pin_uv_auth(
            pin,
            permissions::MAKE_CREDENTIAL,
            options.rp_id,
            options.client_data_hash,
        )?;
        let request = MakeCredentialRequest {
            client_data_hash: options.client_data_hash.to_vec(),
            rp: RelyingParty::new(options.rp_id),
            user: options.user,
            pub_key_cred_params: vec![PublicKeyCredentialParameters::es256()],
            resident_key: options.resident_key,
            pin_uv_auth,
        };

        debug!(rp = options.rp_id, rk = options.resident_key, "makeCredential");
        let response = self.call(CommandCode::MakeCredential, &request.encode()?, timeout)?;
        Attestation::parse(&response)
    }

    /// authenticatorGetAssertion for a single allowed credential, with up=true
    pub fn get_assertion(
        &mut self,
        rp_id: &str,
        client_data_hash: &[u8],
        credential_id: &[u8],
        pin: Option<&str>,
        timeout: Duration,
    ) -> Result<Assertion> {
        let pin_uv_auth =
            self.pin_uv_auth(pin, permissions::GET_ASSERTION, rp_id, client_data_hash)?;
        let request = GetAssertionRequest {
            rp_id: rp_id.to_string(),
            client_data_hash: client_data_hash.to_vec(),
            allow_list: vec![PublicKeyCredentialDescriptor::new(credential_id.to_vec())],
            user_presence: true,
            pin_uv_auth,
        };

        debug!(rp = rp_id, "getAssertion");
        let response = self.call(CommandCode::GetAssertion, &request.encode()?, timeout)?;
        Assertion::parse(&response)
    }

    fn credential_management_command(&mut self) -> Result<CommandCode> {
        match self.get_info()?.credential_management() {
            Some(CredentialManagementVersion::Standard) => Ok(CommandCode::CredentialManagement),
            Some(CredentialManagementVersion::Preview) => {
                Ok(CommandCode::CredentialManagementPreview)
            }
            None => Err(Error::Unsupported("credential management")),
        }
    }

    /// Run an authenticated credential management subcommand
    fn credential_management(
        &mut self,
        token: &PinToken,
        sub_command: CredSubCommand,
        params: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let command = self.credential_management_command()?;
        let mac = token.authenticate(&cred_mgmt::auth_message(sub_command, params))?;
        let request = cred_mgmt::encode_request(sub_command, params, Some((&mac, token.protocol())))?;
        self.call(command, &request, COMMAND_TIMEOUT)
    }

    /// Resident credential counts
    pub fn credentials_metadata(&mut self, pin: &str) -> Result<CredentialsMetadata> {
        let token = self.pin_uv_auth_token(pin, permissions::CREDENTIAL_MANAGEMENT, None)?;
        let response = self.credential_management(&token, CredSubCommand::GetCredsMetadata, None)?;
        CredentialsMetadata::parse(&response)
    }

    /// Discoverable credentials stored for `rp_id`
    ///
    /// An RP with no credentials yields an empty list, not an error.
    pub fn credentials(&mut self, rp_id: &str, pin: &str) -> Result<Vec<ResidentCredential>> {
        // Fail before asking for a token when the feature is missing
        let command = self.credential_management_command()?;
        let token = self.pin_uv_auth_token(pin, permissions::CREDENTIAL_MANAGEMENT, None)?;

        let rp_id_hash: [u8; 32] = Sha256::digest(rp_id.as_bytes()).into();
        let params = cred_mgmt::sub_command_params(Some(&rp_id_hash), None)?;
        let first = match self.credential_management(
            &token,
            CredSubCommand::EnumerateCredentialsBegin,
            params.as_deref(),
        ) {
            Err(Error::Status(StatusCode::NoCredentials)) => {
                debug!(rp = rp_id, "no resident credentials");
                return Ok(Vec::new());
            }
            other => other?,
        };

        let (entry, total) = cred_mgmt::parse_credential(&first)?;
        // totalCredentials comes from the device; never size an allocation by it
        let total = total.unwrap_or(1) as usize;
        let mut credentials = Vec::with_capacity(total.min(MAX_PREALLOCATED_CREDENTIALS));
        credentials.push(entry);

        let next = cred_mgmt::encode_request(
            CredSubCommand::EnumerateCredentialsGetNextCredential,
            None,
            None,
        )?;
        while credentials.len() < total {
            let response = match self.call(command, &next, COMMAND_TIMEOUT) {
                // The device overstated its total; keep what it did return
                Err(Error::Status(StatusCode::NotAllowed | StatusCode::NoCredentials)) => {
                    warn!(
                        rp = rp_id,
                        total,
                        returned = credentials.len(),
                        "device returned fewer credentials than it reported"
                    );
                    break;
                }
                other => other?,
            };
            credentials.push(cred_mgmt::parse_credential(&response)?.0);
        }
        debug!(rp = rp_id, count = credentials.len(), "enumerated credentials");
        Ok(credentials)
    }

    /// Remove a discoverable credential
    pub fn delete_credential(&mut self, credential_id: &[u8], pin: &str) -> Result<()> {
        let token = self.pin_uv_auth_token(pin, permissions::CREDENTIAL_MANAGEMENT, None)?;
        let descriptor = PublicKeyCredentialDescriptor::new(credential_id.to_vec());
        let params = cred_mgmt::sub_command_params(None, Some(&descriptor))?;
        self.credential_management(&token, CredSubCommand::DeleteCredential, params.as_deref())?;
        Ok(())
    }

    /// authenticatorReset; most devices require a touch shortly after power-up
    pub fn reset(&mut self) -> Result<()> {
        self.call(CommandCode::Reset, &[], INTERACTIVE_TIMEOUT)?;
        self.info = None;
        Ok(())
    }

    /// Give back the underlying device
    pub fn into_inner(self) -> D {
        self.channel.into_inner()
    }
}

