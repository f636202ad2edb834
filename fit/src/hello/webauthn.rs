//! [`PlatformApi`] on webauthn.dll

use super::{
    Attachment, CredentialHint, GetAssertionOptions, HiddenWindow, MakeCredentialOptions, PlatformApi,
    PlatformAssertion, PlatformAttestation, PlatformCredential,
};
use crate::error::{Error, Result};

use windows::Win32::Foundation::NTE_NOT_FOUND;
use windows::Win32::Networking::WindowsWebServices::*;
use windows::core::{PCWSTR, w};

use tracing::debug;

fn platform_error(e: windows::core::Error) -> Error {
    Error::Platform(format!("{} (HRESULT 0x{:08X})", e.message(), e.code().0))
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Copy a buffer owned by webauthn.dll
unsafe fn copy_bytes(ptr: *const u8, len: u32) -> Vec<u8> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }.to_vec()
}

unsafe fn read_wide(s: PCWSTR) -> String {
    if s.is_null() {
        return String::new();
    }
    unsafe { s.to_string() }.unwrap_or_default()
}

fn attachment_flag(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Platform => WEBAUTHN_AUTHENTICATOR_ATTACHMENT_PLATFORM,
        Attachment::CrossPlatform => WEBAUTHN_AUTHENTICATOR_ATTACHMENT_CROSS_PLATFORM,
    }
}

fn timeout_ms(timeout: std::time::Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// First API version whose option structs carry credential hints
const CREDENTIAL_HINTS_API_VERSION: u32 = 8;

/// Hint strings and the pointer array webauthn.dll reads them through
struct WideHints {
    _strings: Vec<Vec<u16>>,
    pointers: Vec<PCWSTR>,
}

impl WideHints {
    fn new(hints: &[CredentialHint]) -> Self {
        let strings: Vec<Vec<u16>> = hints.iter().map(|hint| wide(hint.as_str())).collect();
        let pointers = strings.iter().map(|s| PCWSTR(s.as_ptr())).collect();
        Self {
            _strings: strings,
            pointers,
        }
    }

    fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

/// Windows Hello via the system WebAuthn API
///
/// Dialogs need an owner window; it is created on the first ceremony and
/// destroyed with this value.
#[derive(Default)]
pub struct WindowsHello {
    window: Option<HiddenWindow>,
}

impl WindowsHello {
    pub fn new() -> Self {
        Self::default()
    }

    fn window(&mut self) -> Result<&HiddenWindow> {
        if self.window.is_none() {
            self.window = Some(HiddenWindow::new()?);
        }
        self.window
            .as_ref()
            .ok_or_else(|| Error::Platform("hidden window unavailable".into()))
    }
}

impl PlatformApi for WindowsHello {
    fn api_version(&self) -> u32 {
        unsafe { WebAuthNGetApiVersionNumber() }
    }

    fn platform_authenticator_available(&self) -> Result<bool> {
        unsafe { WebAuthNIsUserVerifyingPlatformAuthenticatorAvailable() }
            .map(|available| available.as_bool())
            .map_err(platform_error)
    }

    fn credentials(&self, rp_id: Option<&str>) -> Result<Vec<PlatformCredential>> {
        let rp_wide = rp_id.map(wide);
        let options = WEBAUTHN_GET_CREDENTIALS_OPTIONS {
            dwVersion: WEBAUTHN_GET_CREDENTIALS_OPTIONS_CURRENT_VERSION,
            pwszRpId: rp_wide
                .as_ref()
                .map_or(PCWSTR::null(), |rp| PCWSTR(rp.as_ptr())),
            bBrowserInPrivateMode: false.into(),
        };

        let list = match unsafe { WebAuthNGetPlatformCredentialList(&options) } {
            Ok(list) => list,
            Err(e) if e.code() == NTE_NOT_FOUND => return Ok(Vec::new()),
            Err(e) => return Err(platform_error(e)),
        };

        let mut credentials = Vec::new();
        unsafe {
            let details = &*list;
            for i in 0..details.cCredentialDetails as usize {
                let entry = &**details.ppCredentialDetails.add(i);
                let rp = entry.pRpInformation.as_ref();
                let user = entry.pUserInformation.as_ref();
                credentials.push(PlatformCredential {
                    id: copy_bytes(entry.pbCredentialID, entry.cbCredentialID),
                    rp_id: rp.map(|rp| read_wide(rp.pwszId)).unwrap_or_default(),
                    user_name: user.map(|u| read_wide(u.pwszName)).unwrap_or_default(),
                    removable: entry.bRemovable.as_bool(),
                    backed_up: entry.bBackedUp.as_bool(),
                });
            }
            WebAuthNFreePlatformCredentialList(list);
        }
        debug!(count = credentials.len(), "platform credentials");
        Ok(credentials)
    }

    fn make_credential(
        &mut self,
        options: &MakeCredentialOptions<'_>,
    ) -> Result<PlatformAttestation> {
        let hwnd = self.window()?.handle();

        let rp_id = wide(options.rp_id);
        let user_name = wide(options.user_name);
        let display_name = wide(options.display_name);
        let mut user_id = options.user_id.to_vec();
        let mut client_json = options.client_data_json.to_vec();

        let rp = WEBAUTHN_RP_ENTITY_INFORMATION {
            dwVersion: WEBAUTHN_RP_ENTITY_INFORMATION_CURRENT_VERSION,
            pwszId: PCWSTR(rp_id.as_ptr()),
            pwszName: PCWSTR(rp_id.as_ptr()),
            pwszIcon: PCWSTR::null(),
        };
        let user = WEBAUTHN_USER_ENTITY_INFORMATION {
            dwVersion: WEBAUTHN_USER_ENTITY_INFORMATION_CURRENT_VERSION,
            cbId: user_id.len() as u32,
            pbId: user_id.as_mut_ptr(),
            pwszName: PCWSTR(user_name.as_ptr()),
            pwszIcon: PCWSTR::null(),
            pwszDisplayName: PCWSTR(display_name.as_ptr()),
        };
        let mut es256 = WEBAUTHN_COSE_CREDENTIAL_PARAMETER {
            dwVersion: WEBAUTHN_COSE_CREDENTIAL_PARAMETER_CURRENT_VERSION,
            pwszCredentialType: w!("public-key"),
            lAlg: WEBAUTHN_COSE_ALGORITHM_ECDSA_P256_WITH_SHA256,
        };
        let params = WEBAUTHN_COSE_CREDENTIAL_PARAMETERS {
            cCredentialParameters: 1,
            pCredentialParameters: &mut es256,
        };
        let client_data = WEBAUTHN_CLIENT_DATA {
            dwVersion: WEBAUTHN_CLIENT_DATA_CURRENT_VERSION,
            cbClientDataJSON: client_json.len() as u32,
            pbClientDataJSON: client_json.as_mut_ptr(),
            pwszHashAlgId: w!("SHA-256"),
        };
        let mut hints = WideHints::new(options.hints);
        let mut make_options = WEBAUTHN_AUTHENTICATOR_MAKE_CREDENTIAL_OPTIONS {
            dwVersion: WEBAUTHN_AUTHENTICATOR_MAKE_CREDENTIAL_OPTIONS_CURRENT_VERSION,
            dwTimeoutMilliseconds: timeout_ms(options.timeout),
            dwAuthenticatorAttachment: attachment_flag(options.attachment),
            dwUserVerificationRequirement: WEBAUTHN_USER_VERIFICATION_REQUIREMENT_DISCOURAGED,
            bPreferResidentKey: options.resident_key.into(),
            ..Default::default()
        };
        if !hints.is_empty() && self.api_version() >= CREDENTIAL_HINTS_API_VERSION {
            make_options.cCredentialHints = hints.pointers.len() as u32;
            make_options.ppwszCredentialHints = hints.pointers.as_mut_ptr();
        }

        unsafe {
            let attestation = WebAuthNAuthenticatorMakeCredential(
                hwnd,
                &rp,
                &user,
                &params,
                &client_data,
                Some(&make_options),
            )
            .map_err(platform_error)?;

            let att = &*attestation;
            let result = PlatformAttestation {
                credential_id: copy_bytes(att.pbCredentialId, att.cbCredentialId),
                resident_key: att.bResidentKey.as_bool(),
            };
            WebAuthNFreeCredentialAttestation(Some(attestation as *const _));
            Ok(result)
        }
    }

    fn get_assertion(&mut self, options: &GetAssertionOptions<'_>) -> Result<PlatformAssertion> {
        let hwnd = self.window()?.handle();

        let rp_id = wide(options.rp_id);
        let mut client_json = options.client_data_json.to_vec();
        let mut allow_id = options.credential_id.map(<[u8]>::to_vec);
        let mut allow = allow_id.as_mut().map(|id| WEBAUTHN_CREDENTIAL {
            dwVersion: WEBAUTHN_CREDENTIAL_CURRENT_VERSION,
            cbId: id.len() as u32,
            pbId: id.as_mut_ptr(),
            pwszCredentialType: w!("public-key"),
        });
        let credential_list = match allow.as_mut() {
            Some(credential) => WEBAUTHN_CREDENTIALS {
                cCredentials: 1,
                pCredentials: credential,
            },
            None => WEBAUTHN_CREDENTIALS::default(),
        };

        let client_data = WEBAUTHN_CLIENT_DATA {
            dwVersion: WEBAUTHN_CLIENT_DATA_CURRENT_VERSION,
            cbClientDataJSON: client_json.len() as u32,
            pbClientDataJSON: client_json.as_mut_ptr(),
            pwszHashAlgId: w!("SHA-256"),
        };
        let mut hints = WideHints::new(options.hints);
        let mut assert_options = WEBAUTHN_AUTHENTICATOR_GET_ASSERTION_OPTIONS {
            dwVersion: WEBAUTHN_AUTHENTICATOR_GET_ASSERTION_OPTIONS_CURRENT_VERSION,
            dwTimeoutMilliseconds: timeout_ms(options.timeout),
            CredentialList: credential_list,
            dwAuthenticatorAttachment: attachment_flag(options.attachment),
            dwUserVerificationRequirement: WEBAUTHN_USER_VERIFICATION_REQUIREMENT_DISCOURAGED,
            ..Default::default()
        };
        if !hints.is_empty() && self.api_version() >= CREDENTIAL_HINTS_API_VERSION {
            assert_options.cCredentialHints = hints.pointers.len() as u32;
            assert_options.ppwszCredentialHints = hints.pointers.as_mut_ptr();
        }

        unsafe {
            let assertion = WebAuthNAuthenticatorGetAssertion(
                hwnd,
                PCWSTR(rp_id.as_ptr()),
                &client_data,
                Some(&assert_options),
            )
            .map_err(platform_error)?;

            let a = &*assertion;
            let result = PlatformAssertion {
                credential_id: copy_bytes(a.Credential.pbId, a.Credential.cbId),
                signature: copy_bytes(a.pbSignature, a.cbSignature),
                authenticator_data: copy_bytes(a.pbAuthenticatorData, a.cbAuthenticatorData),
            };
            WebAuthNFreeAssertion(assertion);
            Ok(result)
        }
    }

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()> {
        unsafe { WebAuthNDeletePlatformCredential(credential_id) }.map_err(platform_error)
    }
}
