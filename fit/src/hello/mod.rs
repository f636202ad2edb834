//! Windows Hello through the Windows WebAuthn API
//!
//! [`PlatformApi`] is the slice of webauthn.dll the tool uses. The real
//! implementation only exists on Windows; elsewhere the trait is still
//! available so the command logic can run against other implementations.

#[cfg(windows)]
mod webauthn;
#[cfg(windows)]
mod window;

#[cfg(windows)]
pub use webauthn::WindowsHello;
#[cfg(windows)]
pub use window::HiddenWindow;

use crate::backend::{
    AssertRequest, AssertionResult, Backend, CreateRequest, CreatedCredential, CredentialEntry,
};
use crate::client_data::{Ceremony, ClientData};
use crate::error::Result;

use std::time::Duration;

use tracing::debug;

/// Which authenticators the platform may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    /// Windows Hello itself
    #[default]
    Platform,
    /// External security keys through the OS selector
    CrossPlatform,
}

impl Attachment {
    pub fn from_device_flag(device: bool) -> Self {
        if device {
            Attachment::CrossPlatform
        } else {
            Attachment::Platform
        }
    }

    /// Credential hints that go with this attachment
    pub fn hints(self) -> &'static [CredentialHint] {
        match self {
            Attachment::Platform => &[],
            Attachment::CrossPlatform => &[CredentialHint::SecurityKey],
        }
    }
}

/// WebAuthn `PublicKeyCredentialHint`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialHint {
    SecurityKey,
}

impl CredentialHint {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialHint::SecurityKey => "security-key",
        }
    }
}

/// A credential in the platform credential store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCredential {
    pub id: Vec<u8>,
    pub rp_id: String,
    pub user_name: String,
    pub removable: bool,
    pub backed_up: bool,
}

#[derive(Debug, Clone)]
pub struct MakeCredentialOptions<'a> {
    pub rp_id: &'a str,
    pub user_id: &'a [u8],
    pub user_name: &'a str,
    pub display_name: &'a str,
    pub client_data_json: &'a [u8],
    pub attachment: Attachment,
    /// Ignored by API versions without hint support
    pub hints: &'a [CredentialHint],
    /// Preferred, not required
    pub resident_key: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GetAssertionOptions<'a> {
    pub rp_id: &'a str,
    pub client_data_json: &'a [u8],
    /// Empty allowList when `None`
    pub credential_id: Option<&'a [u8]>,
    pub attachment: Attachment,
    pub hints: &'a [CredentialHint],
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PlatformAttestation {
    pub credential_id: Vec<u8>,
    pub resident_key: bool,
}

#[derive(Debug, Clone)]
pub struct PlatformAssertion {
    pub credential_id: Vec<u8>,
    pub signature: Vec<u8>,
    pub authenticator_data: Vec<u8>,
}

/// Operations of the Windows WebAuthn API
///
/// User verification is always "discouraged".
pub trait PlatformApi {
    fn api_version(&self) -> u32;

    fn platform_authenticator_available(&self) -> Result<bool>;

    /// Platform credentials, optionally for one RP
    fn credentials(&self, rp_id: Option<&str>) -> Result<Vec<PlatformCredential>>;

    fn make_credential(&mut self, options: &MakeCredentialOptions<'_>)
    -> Result<PlatformAttestation>;

    fn get_assertion(&mut self, options: &GetAssertionOptions<'_>) -> Result<PlatformAssertion>;

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()>;
}

/// [`Backend`] over a [`PlatformApi`]
///
/// Challenges are wrapped in client data JSON before they reach the API.
pub struct HelloBackend<'a, P: PlatformApi> {
    api: &'a mut P,
    attachment: Attachment,
}

impl<'a, P: PlatformApi> HelloBackend<'a, P> {
    pub fn new(api: &'a mut P, attachment: Attachment) -> Self {
        Self { api, attachment }
    }
}

impl<P: PlatformApi> Backend for HelloBackend<'_, P> {
    fn name(&self) -> &'static str {
        "hello"
    }

    fn enumerate_credentials(&mut self, rp_id: &str) -> Result<Vec<CredentialEntry>> {
        let rp_filter = Some(rp_id).filter(|rp| !rp.is_empty());
        Ok(self
            .api
            .credentials(rp_filter)?
            .into_iter()
            .map(|c| CredentialEntry {
                id: c.id,
                user_name: Some(c.user_name),
            })
            .collect())
    }

    fn make_credential(&mut self, request: &CreateRequest<'_>) -> Result<CreatedCredential> {
        let client_data =
            ClientData::new(Ceremony::Create, request.rp_id, request.challenge).to_json()?;
        let attestation = self.api.make_credential(&MakeCredentialOptions {
            rp_id: request.rp_id,
            user_id: request.user_id,
            user_name: request.user_name,
            display_name: request.display_name,
            client_data_json: &client_data,
            attachment: self.attachment,
            hints: self.attachment.hints(),
            resident_key: request.resident_key,
            timeout: request.timeout,
        })?;
        debug!(resident = attestation.resident_key, "platform credential created");
        Ok(CreatedCredential {
            id: attestation.credential_id,
            resident: attestation.resident_key,
        })
    }

    fn get_assertion(&mut self, request: &AssertRequest<'_>) -> Result<AssertionResult> {
        let client_data =
            ClientData::new(Ceremony::Get, request.rp_id, request.challenge).to_json()?;
        let assertion = self.api.get_assertion(&GetAssertionOptions {
            rp_id: request.rp_id,
            client_data_json: &client_data,
            credential_id: request.credential_id,
            attachment: self.attachment,
            hints: self.attachment.hints(),
            timeout: request.timeout,
        })?;
        Ok(AssertionResult {
            credential_id: assertion.credential_id,
            signature: assertion.signature,
            auth_data: assertion.authenticator_data,
        })
    }

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()> {
        self.api.delete_credential(credential_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        client_data: Vec<Vec<u8>>,
        attachments: Vec<Attachment>,
        hints: Vec<Vec<CredentialHint>>,
        allow: Vec<Option<Vec<u8>>>,
    }

    impl PlatformApi for Recorder {
        fn api_version(&self) -> u32 {
            4
        }

        fn platform_authenticator_available(&self) -> Result<bool> {
            Ok(true)
        }

        fn credentials(&self, rp_id: Option<&str>) -> Result<Vec<PlatformCredential>> {
            Ok(vec![PlatformCredential {
                id: vec![7; 8],
                rp_id: rp_id.unwrap_or("any").to_string(),
                user_name: "alice".into(),
                removable: true,
                backed_up: false,
            }])
        }

        fn make_credential(
            &mut self,
            options: &MakeCredentialOptions<'_>,
        ) -> Result<PlatformAttestation> {
            self.client_data.push(options.client_data_json.to_vec());
            self.attachments.push(options.attachment);
            self.hints.push(options.hints.to_vec());
            Ok(PlatformAttestation {
                credential_id: vec![1; 16],
                resident_key: options.resident_key,
            })
        }

        fn get_assertion(&mut self, options: &GetAssertionOptions<'_>) -> Result<PlatformAssertion> {
            self.client_data.push(options.client_data_json.to_vec());
            self.attachments.push(options.attachment);
            self.hints.push(options.hints.to_vec());
            self.allow.push(options.credential_id.map(<[u8]>::to_vec));
            Ok(PlatformAssertion {
                credential_id: options.credential_id.unwrap_or(&[9]).to_vec(),
                signature: vec![0x30],
                authenticator_data: vec![0; 37],
            })
        }

        fn delete_credential(&mut self, _credential_id: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_attachment_from_flag() {
        assert_eq!(Attachment::from_device_flag(true), Attachment::CrossPlatform);
        assert_eq!(Attachment::from_device_flag(false), Attachment::Platform);
    }

    #[test]
    fn test_assertion_wraps_challenge_in_client_data() {
        let mut api = Recorder::default();
        let mut backend = HelloBackend::new(&mut api, Attachment::CrossPlatform);
        let result = backend
            .get_assertion(&AssertRequest {
                rp_id: "example.com",
                credential_id: None,
                challenge: &[0xfb, 0xff],
                timeout: Duration::from_secs(30),
            })
            .unwrap();
        assert_eq!(result.credential_id, vec![9]);

        let json: serde_json::Value = serde_json::from_slice(&api.client_data[0]).unwrap();
        assert_eq!(json["type"], "webauthn.get");
        assert_eq!(json["challenge"], "-_8");
        assert_eq!(json["origin"], "https://example.com");
        assert_eq!(api.attachments, vec![Attachment::CrossPlatform]);
        assert_eq!(api.hints, vec![vec![CredentialHint::SecurityKey]]);
        assert_eq!(api.allow, vec![None]);
    }

    #[test]
    fn test_create_uses_create_ceremony() {
        let mut api = Recorder::default();
        let created = HelloBackend::new(&mut api, Attachment::Platform)
            .make_credential(&CreateRequest {
                rp_id: "https://example.com",
                user_id: b"user",
                user_name: "fit-user",
                display_name: "fit-user",
                resident_key: true,
                challenge: &[1; 32],
                timeout: Duration::from_secs(45),
            })
            .unwrap();
        assert!(created.resident);

        let json: serde_json::Value = serde_json::from_slice(&api.client_data[0]).unwrap();
        assert_eq!(json["type"], "webauthn.create");
        assert_eq!(json["origin"], "https://example.com");
        assert_eq!(api.hints, vec![Vec::<CredentialHint>::new()]);
    }

    #[test]
    fn test_security_key_hint_on_cross_platform_create() {
        let mut api = Recorder::default();
        HelloBackend::new(&mut api, Attachment::CrossPlatform)
            .make_credential(&CreateRequest {
                rp_id: "example.com",
                user_id: b"user",
                user_name: "fit-user",
                display_name: "fit-user",
                resident_key: false,
                challenge: &[1; 32],
                timeout: Duration::from_secs(45),
            })
            .unwrap();
        assert_eq!(api.attachments, vec![Attachment::CrossPlatform]);
        assert_eq!(api.hints, vec![vec![CredentialHint::SecurityKey]]);
        assert_eq!(CredentialHint::SecurityKey.as_str(), "security-key");
        assert!(Attachment::Platform.hints().is_empty());
    }

    #[test]
    fn test_enumeration_filters_by_rp() {
        let mut api = Recorder::default();
        let mut backend = HelloBackend::new(&mut api, Attachment::Platform);
        let entries = backend.enumerate_credentials("example.com").unwrap();
        assert_eq!(entries[0].id, vec![7; 8]);
        assert_eq!(entries[0].user_name.as_deref(), Some("alice"));
        assert_eq!(backend.name(), "hello");
    }
}
