use crate::backend::{
    AssertRequest, AssertionResult, Backend, CreateRequest, CreatedCredential, CredentialEntry,
};
use crate::error::{Error, Result};

use fit_ctap::{CredentialOptions, Device, User};
use fit_transport::HidIo;

use tracing::debug;

/// [`Backend`] for an external security key
///
/// The random challenge is handed to the authenticator directly as the
/// clientDataHash. Credential management requires the PIN given at
/// construction.
pub struct HidBackend<D: HidIo> {
    device: Device<D>,
    pin: Option<String>,
}

impl<D: HidIo> HidBackend<D> {
    pub fn new(device: Device<D>, pin: Option<String>) -> Self {
        Self {
            device,
            pin: pin.filter(|p| !p.is_empty()),
        }
    }

    fn require_pin(&self, operation: &'static str) -> Result<&str> {
        self.pin.as_deref().ok_or(Error::PinRequired(operation))
    }
}

impl<D: HidIo> Backend for HidBackend<D> {
    fn name(&self) -> &'static str {
        "hid"
    }

    fn enumerate_credentials(&mut self, rp_id: &str) -> Result<Vec<CredentialEntry>> {
        let pin = self.require_pin("credential management")?.to_owned();
        let credentials = self.device.credentials(rp_id, &pin)?;
        Ok(credentials
            .into_iter()
            .map(|c| CredentialEntry {
                id: c.credential.id,
                user_name: c.user.name,
            })
            .collect())
    }

    fn make_credential(&mut self, request: &CreateRequest<'_>) -> Result<CreatedCredential> {
        let options = CredentialOptions {
            rp_id: request.rp_id,
            user: User::new(request.user_id.to_vec(), request.user_name, request.display_name),
            resident_key: request.resident_key,
            client_data_hash: request.challenge,
        };
        let attestation =
            self.device
                .make_credential(options, self.pin.as_deref(), request.timeout)?;
        debug!(fmt = %attestation.fmt, "credential created");
        Ok(CreatedCredential {
            id: attestation.credential_id().to_vec(),
            resident: request.resident_key,
        })
    }

    fn get_assertion(&mut self, request: &AssertRequest<'_>) -> Result<AssertionResult> {
        let credential_id = request.credential_id.ok_or(Error::CredentialRequired)?;
        let assertion = self.device.get_assertion(
            request.rp_id,
            request.challenge,
            credential_id,
            self.pin.as_deref(),
            request.timeout,
        )?;
        Ok(AssertionResult {
            credential_id: assertion.credential_id(credential_id).to_vec(),
            auth_data: assertion.auth_data_cbor()?,
            signature: assertion.signature,
        })
    }

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()> {
        let pin = self.require_pin("credential deletion")?.to_owned();
        self.device.delete_credential(credential_id, &pin)?;
        Ok(())
    }
}
