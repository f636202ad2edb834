//! Fakes for fit integration tests
//!
//! Nothing here touches real hardware or the Windows WebAuthn API. The
//! fakes record every call so tests can check what a command did not do
//! as well as what it did.

#![allow(dead_code)]

mod fake_key;

pub use fake_key::FakeKey;

use fit::challenge::ChallengeSource;
use fit::cli::{self, HardwareCli, HelloCli, Invocation};
use fit::hello::{
    Attachment, CredentialHint, GetAssertionOptions, MakeCredentialOptions, PlatformApi, PlatformAssertion,
    PlatformAttestation, PlatformCredential,
};
use fit::hid::DeviceProvider;
use fit::selection::DeviceLocation;
use fit::{Dispatcher, Error, Result};

use fit_transport::{HidIo, Packet};

use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

pub const TEST_VERSION: &str = "1.0.0-test";

/// Challenge source that counts draws and hands out predictable bytes
#[derive(Debug, Default)]
pub struct CountingChallenge {
    pub draws: usize,
}

impl ChallengeSource for CountingChallenge {
    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.draws += 1;
        Ok(vec![self.draws as u8; len])
    }
}

/// Challenge source whose random source is broken
pub struct BrokenChallenge;

impl ChallengeSource for BrokenChallenge {
    fn bytes(&mut self, _len: usize) -> Result<Vec<u8>> {
        Err(Error::Randomness("entropy source unavailable".into()))
    }
}

/// HID connection handed out by [`FakeProvider`]
pub enum FakeIo {
    /// Fails on first use
    Unplugged,
    Key(Rc<RefCell<FakeKey>>),
}

impl HidIo for FakeIo {
    fn write_packet(&mut self, packet: &Packet) -> fit_transport::Result<()> {
        match self {
            FakeIo::Unplugged => Err(fit_transport::Error::DeviceNotFound),
            FakeIo::Key(key) => key.borrow_mut().write_packet(packet),
        }
    }

    fn read_packet(&mut self, timeout: Duration) -> fit_transport::Result<Option<Packet>> {
        match self {
            FakeIo::Unplugged => Err(fit_transport::Error::DeviceNotFound),
            FakeIo::Key(key) => key.borrow_mut().read_packet(timeout),
        }
    }
}

/// Device list with call accounting
///
/// Opened devices are unplugged unless a [`FakeKey`] is attached, in which
/// case every path opens a connection to that key.
#[derive(Default)]
pub struct FakeProvider {
    pub locations: Vec<DeviceLocation>,
    pub location_calls: Cell<usize>,
    pub opened: RefCell<Vec<String>>,
    pub key: Option<Rc<RefCell<FakeKey>>>,
}

impl FakeProvider {
    pub fn with_devices(paths: &[&str]) -> Self {
        Self {
            locations: paths.iter().map(|p| location(p)).collect(),
            ..Default::default()
        }
    }

    /// One device at `/dev/hidraw0` backed by `key`
    pub fn with_key(key: FakeKey) -> Self {
        Self {
            key: Some(Rc::new(RefCell::new(key))),
            ..Self::with_devices(&["/dev/hidraw0"])
        }
    }

    /// State of the attached key after a run
    pub fn key(&self) -> std::cell::Ref<'_, FakeKey> {
        self.key.as_ref().expect("no key attached").borrow()
    }
}

impl DeviceProvider for FakeProvider {
    type Io = FakeIo;

    fn locations(&self) -> Result<Vec<DeviceLocation>> {
        self.location_calls.set(self.location_calls.get() + 1);
        Ok(self.locations.clone())
    }

    fn open(&self, path: &str) -> Result<FakeIo> {
        self.opened.borrow_mut().push(path.to_string());
        Ok(match &self.key {
            Some(key) => FakeIo::Key(Rc::clone(key)),
            None => FakeIo::Unplugged,
        })
    }
}

pub fn location(path: &str) -> DeviceLocation {
    DeviceLocation {
        path: path.to_string(),
        vendor_id: 0x1050,
        product_id: 0x0407,
        manufacturer: "Yubico".into(),
        product: "YubiKey OTP+FIDO+CCID".into(),
    }
}

pub fn platform_credential(rp: &str, user: &str, id: &[u8]) -> PlatformCredential {
    PlatformCredential {
        id: id.to_vec(),
        rp_id: rp.to_string(),
        user_name: user.to_string(),
        removable: true,
        backed_up: false,
    }
}

#[derive(Debug, Clone)]
pub struct RecordedAssertion {
    pub rp_id: String,
    pub allow: Option<Vec<u8>>,
    pub attachment: Attachment,
    pub hints: Vec<CredentialHint>,
    pub client_data: serde_json::Value,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RecordedCreation {
    pub rp_id: String,
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub display_name: String,
    pub attachment: Attachment,
    pub hints: Vec<CredentialHint>,
    pub resident_key: bool,
    pub client_data: serde_json::Value,
    pub timeout: Duration,
}

/// Windows Hello stand-in with an in-memory credential store
#[derive(Default)]
pub struct FakeHello {
    pub credentials: Vec<PlatformCredential>,
    pub list_calls: Cell<usize>,
    pub assertions: Vec<RecordedAssertion>,
    pub creations: Vec<RecordedCreation>,
    pub deleted: Vec<Vec<u8>>,
}

impl FakeHello {
    pub fn with_credentials(credentials: Vec<PlatformCredential>) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    pub fn backend_calls(&self) -> usize {
        self.assertions.len() + self.creations.len() + self.deleted.len()
    }
}

impl PlatformApi for FakeHello {
    fn api_version(&self) -> u32 {
        4
    }

    fn platform_authenticator_available(&self) -> Result<bool> {
        Ok(true)
    }

    fn credentials(&self, rp_id: Option<&str>) -> Result<Vec<PlatformCredential>> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self
            .credentials
            .iter()
            .filter(|c| rp_id.is_none_or(|rp| c.rp_id == rp))
            .cloned()
            .collect())
    }

    fn make_credential(
        &mut self,
        options: &MakeCredentialOptions<'_>,
    ) -> Result<PlatformAttestation> {
        self.creations.push(RecordedCreation {
            rp_id: options.rp_id.to_string(),
            user_id: options.user_id.to_vec(),
            user_name: options.user_name.to_string(),
            display_name: options.display_name.to_string(),
            attachment: options.attachment,
            hints: options.hints.to_vec(),
            resident_key: options.resident_key,
            client_data: serde_json::from_slice(options.client_data_json)?,
            timeout: options.timeout,
        });
        let id = vec![0xC0; 16];
        self.credentials
            .push(platform_credential(options.rp_id, options.user_name, &id));
        Ok(PlatformAttestation {
            credential_id: id,
            resident_key: options.resident_key,
        })
    }

    fn get_assertion(&mut self, options: &GetAssertionOptions<'_>) -> Result<PlatformAssertion> {
        self.assertions.push(RecordedAssertion {
            rp_id: options.rp_id.to_string(),
            allow: options.credential_id.map(<[u8]>::to_vec),
            attachment: options.attachment,
            hints: options.hints.to_vec(),
            client_data: serde_json::from_slice(options.client_data_json)?,
            timeout: options.timeout,
        });
        Ok(PlatformAssertion {
            credential_id: options.credential_id.unwrap_or(&[0xEE, 0xEE]).to_vec(),
            signature: vec![0x30, 0x44],
            authenticator_data: vec![0; 37],
        })
    }

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()> {
        let before = self.credentials.len();
        self.credentials.retain(|c| c.id != credential_id);
        if self.credentials.len() == before {
            return Err(Error::Platform("credential not found (HRESULT 0x80090011)".into()));
        }
        self.deleted.push(credential_id.to_vec());
        Ok(())
    }
}

/// Outcome of one simulated invocation
pub struct Run {
    pub result: anyhow::Result<()>,
    pub stdout: String,
    /// False when the arguments never reached the dispatcher
    pub dispatched: bool,
}

impl Run {
    pub fn error(&self) -> String {
        match &self.result {
            Ok(()) => panic!("expected failure, got success:\n{}", self.stdout),
            Err(e) => format!("{e:#}"),
        }
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not one JSON document ({e}):\n{}", self.stdout))
    }
}

pub fn run_fit<C: ChallengeSource>(
    args: &[&str],
    provider: &FakeProvider,
    challenges: &mut C,
    stdin: &str,
) -> Run {
    let mut out = Vec::new();
    let parsed = cli::parse::<HardwareCli, _, _>(std::iter::once("fit").chain(args.iter().copied()));
    let Invocation::Run(cli, _) = parsed else {
        return Run {
            result: Ok(()),
            stdout: String::new(),
            dispatched: false,
        };
    };
    let config = cli.global.config();
    let result = Dispatcher::new(TEST_VERSION).run_hardware(
        &config,
        cli.command,
        provider,
        challenges,
        &mut Cursor::new(stdin.as_bytes()),
        &mut out,
    );
    Run {
        result,
        stdout: String::from_utf8(out).expect("utf-8 output"),
        dispatched: true,
    }
}

pub fn run_hello<C: ChallengeSource>(args: &[&str], api: &mut FakeHello, challenges: &mut C) -> Run {
    let mut out = Vec::new();
    let parsed =
        cli::parse::<HelloCli, _, _>(std::iter::once("fit-hello").chain(args.iter().copied()));
    let Invocation::Run(cli, _) = parsed else {
        return Run {
            result: Ok(()),
            stdout: String::new(),
            dispatched: false,
        };
    };
    let config = cli.global.config();
    let result = Dispatcher::new(TEST_VERSION).run_hello(&config, cli.command, api, challenges, &mut out);
    Run {
        result,
        stdout: String::from_utf8(out).expect("utf-8 output"),
        dispatched: true,
    }
}
