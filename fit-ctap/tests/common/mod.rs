//! In-memory authenticator for fit-ctap integration tests
//!
//! `FakeKey` speaks CTAPHID on one side and a small CTAP2 authenticator on
//! the other. It runs the real PIN/UV auth protocol math, so a platform
//! request that is encrypted or authenticated wrongly is rejected the same
//! way a hardware key would reject it.

#![allow(dead_code)]

use fit_crypto::ecdh::KeyPair;
use fit_crypto::pin_protocol::pin_hash;
use fit_crypto::{PinUvAuthProtocol, SharedSecret};
use fit_ctap::cbor::{self, MapBuilder, MapParser, Value};
use fit_ctap::commands::client_pin::{cose_key, parse_cose_key};
use fit_ctap::{PublicKeyCredentialDescriptor, User};
use fit_transport::ctaphid::{BROADCAST_CID, Reassembler};
use fit_transport::{Capabilities, Cmd, HidIo, InitResponse, Message, Packet};

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use sha2::{Digest, Sha256};

pub const CID: u32 = 0xC0DE_0001;

const OK: u8 = 0x00;
const INVALID_PARAMETER: u8 = 0x02;
const NO_CREDENTIALS: u8 = 0x2E;
const PIN_INVALID: u8 = 0x31;
const PIN_AUTH_INVALID: u8 = 0x33;
const PIN_NOT_SET: u8 = 0x35;
const PIN_REQUIRED: u8 = 0x36;
const PIN_POLICY_VIOLATION: u8 = 0x37;

#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub rp_id: String,
    pub id: Vec<u8>,
    pub user: User,
}

pub struct FakeKey {
    inbound: Vec<Packet>,
    outbound: VecDeque<Packet>,

    key_agreement: KeyPair,
    token: [u8; 32],
    enumeration: VecDeque<StoredCredential>,

    /// Extra getInfo options besides clientPin
    pub options: Vec<(&'static str, bool)>,
    pub protocols: Vec<u8>,
    /// Whether the clientPin option is advertised at all
    pub has_client_pin: bool,
    pub pin: Option<String>,
    pub retries: u32,
    pub credentials: Vec<StoredCredential>,
    /// totalCredentials to report instead of the real count
    pub total_override: Option<u32>,

    /// CTAP command bytes in arrival order
    pub commands: Vec<u8>,
    /// clientPIN subcommands in arrival order
    pub pin_sub_commands: Vec<u8>,
    pub last_permissions: Option<u8>,
    pub last_up: Option<bool>,
}

impl FakeKey {
    /// A CTAP 2.1 key with credMgmt, pinUvAuthToken, and both protocols
    pub fn new() -> Self {
        Self {
            inbound: Vec::new(),
            outbound: VecDeque::new(),
            key_agreement: KeyPair::generate(),
            token: [0x5C; 32],
            enumeration: VecDeque::new(),
            options: vec![
                ("credMgmt", true),
                ("pinUvAuthToken", true),
                ("rk", true),
                ("up", true),
            ],
            protocols: vec![2, 1],
            has_client_pin: true,
            pin: None,
            retries: 8,
            credentials: Vec::new(),
            total_override: None,
            commands: Vec::new(),
            pin_sub_commands: Vec::new(),
            last_permissions: None,
            last_up: None,
        }
    }

    /// A CTAP 2.0 key: protocol one, legacy tokens, preview credential management
    pub fn legacy() -> Self {
        let mut key = Self::new();
        key.options = vec![("credentialMgmtPreview", true), ("rk", true), ("up", true)];
        key.protocols = vec![1];
        key
    }

    pub fn with_pin(mut self, pin: &str) -> Self {
        self.pin = Some(pin.to_string());
        self
    }

    pub fn with_credential(mut self, rp_id: &str, id: Vec<u8>, name: &str) -> Self {
        self.credentials.push(StoredCredential {
            rp_id: rp_id.to_string(),
            id,
            user: User::new(name.as_bytes().to_vec(), name, name),
        });
        self
    }

    fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        let Some((&cmd, params)) = request.split_first() else {
            return vec![INVALID_PARAMETER];
        };
        self.commands.push(cmd);

        let result = match cmd {
            0x01 => self.make_credential(params),
            0x02 => self.get_assertion(params),
            0x04 => self.get_info(),
            0x06 => self.client_pin(params),
            0x07 => self.reset(),
            0x0A | 0x41 => self.credential_management(params),
            _ => Err(0x01),
        };
        match result {
            Ok(body) => {
                let mut response = vec![OK];
                response.extend(body);
                response
            }
            Err(status) => vec![status],
        }
    }

    fn get_info(&self) -> Result<Vec<u8>, u8> {
        let mut options: BTreeMap<String, bool> = self
            .options
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        if self.has_client_pin {
            options.insert("clientPin".into(), self.pin.is_some());
        }
        MapBuilder::new()
            .insert(0x01, vec!["FIDO_2_0", "FIDO_2_1"])
            .and_then(|b| b.insert_bytes(0x03, &[0xF1; 16]))
            .and_then(|b| b.insert(0x04, options))
            .and_then(|b| b.insert(0x06, self.protocols.clone()))
            .and_then(|b| b.build())
            .map_err(|_| INVALID_PARAMETER)
    }

    fn shared_secret(&self, protocol: PinUvAuthProtocol, key: Option<&Value>) -> Result<SharedSecret, u8> {
        let key = key.ok_or(INVALID_PARAMETER)?;
        let (x, y) = parse_cose_key(key).map_err(|_| INVALID_PARAMETER)?;
        let z = self
            .key_agreement
            .shared_secret_cose(&x, &y)
            .map_err(|_| INVALID_PARAMETER)?;
        protocol.shared_secret(&z).map_err(|_| INVALID_PARAMETER)
    }

    fn check_pin_hash(&mut self, secret: &SharedSecret, pin_hash_enc: &[u8]) -> Result<(), u8> {
        let current = self.pin.clone().ok_or(PIN_NOT_SET)?;
        let hash = secret.decrypt(pin_hash_enc).map_err(|_| PIN_INVALID)?;
        if hash != pin_hash(&current) {
            self.retries = self.retries.saturating_sub(1);
            return Err(PIN_INVALID);
        }
        Ok(())
    }

    fn decrypt_new_pin(secret: &SharedSecret, new_pin_enc: &[u8]) -> Result<String, u8> {
        let padded = secret.decrypt(new_pin_enc).map_err(|_| PIN_AUTH_INVALID)?;
        if padded.len() != 64 {
            return Err(INVALID_PARAMETER);
        }
        let end = padded.iter().position(|b| *b == 0).unwrap_or(padded.len());
        let pin = String::from_utf8(padded[..end].to_vec()).map_err(|_| INVALID_PARAMETER)?;
        if pin.len() < 4 {
            return Err(PIN_POLICY_VIOLATION);
        }
        Ok(pin)
    }

    fn client_pin(&mut self, params: &[u8]) -> Result<Vec<u8>, u8> {
        let p = MapParser::from_bytes(params).map_err(|_| INVALID_PARAMETER)?;
        let protocol = p
            .get::<u8>(0x01)
            .ok()
            .and_then(PinUvAuthProtocol::from_u8)
            .ok_or(INVALID_PARAMETER)?;
        let sub: u8 = p.get(0x02).map_err(|_| INVALID_PARAMETER)?;
        self.pin_sub_commands.push(sub);

        let bytes = |key| p.get_bytes(key).map_err(|_| INVALID_PARAMETER);
        match sub {
            0x01 => MapBuilder::new()
                .insert(0x03, self.retries)
                .and_then(|b| b.build())
                .map_err(|_| INVALID_PARAMETER),
            0x02 => {
                let (x, y) = self.key_agreement.public_key_cose();
                let key = cose_key(&x, &y).map_err(|_| INVALID_PARAMETER)?;
                MapBuilder::new()
                    .insert_raw(0x01, key)
                    .and_then(|b| b.build())
                    .map_err(|_| INVALID_PARAMETER)
            }
            0x03 => {
                if self.pin.is_some() {
                    return Err(PIN_AUTH_INVALID);
                }
                let secret = self.shared_secret(protocol, p.value(0x03))?;
                let new_pin_enc = bytes(0x05)?;
                if secret.authenticate(&new_pin_enc).ok() != Some(bytes(0x04)?) {
                    return Err(PIN_AUTH_INVALID);
                }
                self.pin = Some(Self::decrypt_new_pin(&secret, &new_pin_enc)?);
                Ok(Vec::new())
            }
            0x04 => {
                let secret = self.shared_secret(protocol, p.value(0x03))?;
                let new_pin_enc = bytes(0x05)?;
                let pin_hash_enc = bytes(0x06)?;
                let mut message = new_pin_enc.clone();
                message.extend_from_slice(&pin_hash_enc);
                if secret.authenticate(&message).ok() != Some(bytes(0x04)?) {
                    return Err(PIN_AUTH_INVALID);
                }
                self.check_pin_hash(&secret, &pin_hash_enc)?;
                self.pin = Some(Self::decrypt_new_pin(&secret, &new_pin_enc)?);
                Ok(Vec::new())
            }
            0x05 | 0x09 => {
                let secret = self.shared_secret(protocol, p.value(0x03))?;
                self.check_pin_hash(&secret, &bytes(0x06)?)?;
                self.last_permissions = p.get_opt(0x09).map_err(|_| INVALID_PARAMETER)?;
                let token = secret.encrypt(&self.token).map_err(|_| INVALID_PARAMETER)?;
                MapBuilder::new()
                    .insert_bytes(0x02, &token)
                    .and_then(|b| b.build())
                    .map_err(|_| INVALID_PARAMETER)
            }
            _ => Err(0x3E),
        }
    }

    /// Verify a token-keyed pinUvAuthParam when a PIN is set
    fn check_token_mac(&self, p: &MapParser, param_key: i32, protocol_key: i32, message: &[u8]) -> Result<(), u8> {
        if self.pin.is_none() {
            return Ok(());
        }
        let param = p.get_bytes_opt(param_key).map_err(|_| INVALID_PARAMETER)?.ok_or(PIN_REQUIRED)?;
        let protocol = p
            .get::<u8>(protocol_key)
            .ok()
            .and_then(PinUvAuthProtocol::from_u8)
            .ok_or(INVALID_PARAMETER)?;
        match protocol.authenticate(&self.token, message) {
            Ok(expected) if expected == param => Ok(()),
            _ => Err(PIN_AUTH_INVALID),
        }
    }

    fn auth_data(rp_id: &str, flags: u8, credential_id: Option<&[u8]>) -> Vec<u8> {
        let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&1u32.to_be_bytes());
        if let Some(id) = credential_id {
            data.extend_from_slice(&[0xF1; 16]);
            data.extend_from_slice(&(id.len() as u16).to_be_bytes());
            data.extend_from_slice(id);
            data.push(0xa0);
        }
        data
    }

    fn make_credential(&mut self, params: &[u8]) -> Result<Vec<u8>, u8> {
        let p = MapParser::from_bytes(params).map_err(|_| INVALID_PARAMETER)?;
        let cdh = p.get_bytes(0x01).map_err(|_| INVALID_PARAMETER)?;
        self.check_token_mac(&p, 0x08, 0x09, &cdh)?;

        let rp: fit_ctap::RelyingParty = p.get(0x02).map_err(|_| INVALID_PARAMETER)?;
        let user: User = p.get(0x03).map_err(|_| INVALID_PARAMETER)?;
        let options: BTreeMap<String, bool> =
            p.get_opt(0x07).map_err(|_| INVALID_PARAMETER)?.unwrap_or_default();

        let id = vec![self.commands.len() as u8; 16];
        if options.get("rk") == Some(&true) {
            self.credentials.push(StoredCredential {
                rp_id: rp.id.clone(),
                id: id.clone(),
                user,
            });
        }

        MapBuilder::new()
            .insert(0x01, "none")
            .and_then(|b| b.insert_bytes(0x02, &Self::auth_data(&rp.id, 0x41, Some(&id))))
            .and_then(|b| b.insert_raw(0x03, vec![0xa0]))
            .and_then(|b| b.build())
            .map_err(|_| INVALID_PARAMETER)
    }

    fn get_assertion(&mut self, params: &[u8]) -> Result<Vec<u8>, u8> {
        let p = MapParser::from_bytes(params).map_err(|_| INVALID_PARAMETER)?;
        let rp_id: String = p.get(0x01).map_err(|_| INVALID_PARAMETER)?;
        let cdh = p.get_bytes(0x02).map_err(|_| INVALID_PARAMETER)?;
        self.check_token_mac(&p, 0x06, 0x07, &cdh)?;

        let options: BTreeMap<String, bool> =
            p.get_opt(0x05).map_err(|_| INVALID_PARAMETER)?.unwrap_or_default();
        self.last_up = options.get("up").copied();

        let allow: Vec<PublicKeyCredentialDescriptor> =
            p.get_opt(0x03).map_err(|_| INVALID_PARAMETER)?.unwrap_or_default();
        let credential = allow.first().ok_or(NO_CREDENTIALS)?;

        let mut signature = Sha256::digest(&cdh).to_vec();
        signature.insert(0, 0x30);
        MapBuilder::new()
            .insert(0x01, credential)
            .and_then(|b| b.insert_bytes(0x02, &Self::auth_data(&rp_id, 0x01, None)))
            .and_then(|b| b.insert_bytes(0x03, &signature))
            .and_then(|b| b.build())
            .map_err(|_| INVALID_PARAMETER)
    }

    fn credential_entry(credential: &StoredCredential, total: Option<u32>) -> Result<Vec<u8>, u8> {
        MapBuilder::new()
            .insert(0x06, &credential.user)
            .and_then(|b| b.insert(0x07, PublicKeyCredentialDescriptor::new(credential.id.clone())))
            .and_then(|b| b.insert_opt(0x09, total))
            .and_then(|b| b.build())
            .map_err(|_| INVALID_PARAMETER)
    }

    fn credential_management(&mut self, params: &[u8]) -> Result<Vec<u8>, u8> {
        let p = MapParser::from_bytes(params).map_err(|_| INVALID_PARAMETER)?;
        let sub: u8 = p.get(0x01).map_err(|_| INVALID_PARAMETER)?;

        if sub != 0x05 {
            let mut message = vec![sub];
            if let Some(sub_params) = p.value(0x02) {
                message.extend(cbor::encode(sub_params).map_err(|_| INVALID_PARAMETER)?);
            }
            if self.pin.is_none() {
                return Err(PIN_NOT_SET);
            }
            self.check_token_mac(&p, 0x04, 0x03, &message)?;
        }

        let sub_params = || -> Result<MapParser, u8> {
            let value = p.value(0x02).ok_or(INVALID_PARAMETER)?;
            let encoded = cbor::encode(value).map_err(|_| INVALID_PARAMETER)?;
            MapParser::from_bytes(&encoded).map_err(|_| INVALID_PARAMETER)
        };

        match sub {
            0x01 => MapBuilder::new()
                .insert(0x01, self.credentials.len() as u32)
                .and_then(|b| b.insert(0x02, 25 - self.credentials.len() as u32))
                .and_then(|b| b.build())
                .map_err(|_| INVALID_PARAMETER),
            0x04 => {
                let hash = sub_params()?.get_bytes(0x01).map_err(|_| INVALID_PARAMETER)?;
                self.enumeration = self
                    .credentials
                    .iter()
                    .filter(|c| Sha256::digest(c.rp_id.as_bytes()).as_slice() == hash.as_slice())
                    .cloned()
                    .collect();
                let total = self.total_override.unwrap_or(self.enumeration.len() as u32);
                let first = self.enumeration.pop_front().ok_or(NO_CREDENTIALS)?;
                Self::credential_entry(&first, Some(total))
            }
            0x05 => {
                let next = self.enumeration.pop_front().ok_or(0x30)?;
                Self::credential_entry(&next, None)
            }
            0x06 => {
                let descriptor: PublicKeyCredentialDescriptor =
                    sub_params()?.get(0x02).map_err(|_| INVALID_PARAMETER)?;
                let before = self.credentials.len();
                self.credentials.retain(|c| c.id != descriptor.id);
                if self.credentials.len() == before {
                    return Err(NO_CREDENTIALS);
                }
                Ok(Vec::new())
            }
            _ => Err(0x3E),
        }
    }

    fn reset(&mut self) -> Result<Vec<u8>, u8> {
        self.pin = None;
        self.retries = 8;
        self.credentials.clear();
        Ok(Vec::new())
    }

    fn respond(&mut self, request: Message) {
        let reply = match request.cmd {
            Cmd::Init => {
                let mut nonce = [0u8; 8];
                nonce.copy_from_slice(&request.data[..8]);
                let init = InitResponse {
                    nonce,
                    cid: CID,
                    protocol_version: 2,
                    major: 1,
                    minor: 7,
                    build: 2,
                    capabilities: Capabilities(Capabilities::CBOR | Capabilities::WINK),
                };
                Message::new(BROADCAST_CID, Cmd::Init, init.to_bytes().to_vec())
            }
            Cmd::Cbor => Message::new(CID, Cmd::Cbor, self.handle(&request.data)),
            _ => Message::new(CID, Cmd::Error, vec![0x01]),
        };
        if let Ok(packets) = reply.to_packets() {
            self.outbound.extend(packets);
        }
    }
}

impl Default for FakeKey {
    fn default() -> Self {
        Self::new()
    }
}

impl HidIo for FakeKey {
    fn write_packet(&mut self, packet: &Packet) -> fit_transport::Result<()> {
        if packet.is_init() {
            self.inbound.clear();
        }
        self.inbound.push(packet.clone());

        let expected = self.inbound[0].payload_len().unwrap_or(0);
        let received = 57 + (self.inbound.len() - 1) * 59;
        if received >= expected {
            let request = Reassembler::collect(&self.inbound)?;
            self.inbound.clear();
            self.respond(request);
        }
        Ok(())
    }

    fn read_packet(&mut self, _timeout: Duration) -> fit_transport::Result<Option<Packet>> {
        Ok(self.outbound.pop_front())
    }
}
