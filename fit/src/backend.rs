//! Authenticator capability set shared by the security key and Windows
//! Hello front ends
//!
//! Selection and output logic is written once against [`Backend`]; the
//! two implementations differ only in how a challenge reaches the
//! authenticator (directly as clientDataHash, or inside client data JSON).

use crate::error::Result;

use std::time::Duration;

/// A credential found by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub id: Vec<u8>,
    pub user_name: Option<String>,
}

impl CredentialEntry {
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            user_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub rp_id: &'a str,
    pub user_id: &'a [u8],
    pub user_name: &'a str,
    pub display_name: &'a str,
    pub resident_key: bool,
    pub challenge: &'a [u8],
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CreatedCredential {
    pub id: Vec<u8>,
    /// Whether the authenticator stored it as discoverable
    pub resident: bool,
}

#[derive(Debug, Clone)]
pub struct AssertRequest<'a> {
    pub rp_id: &'a str,
    /// `None` lets the platform pick the credential
    pub credential_id: Option<&'a [u8]>,
    pub challenge: &'a [u8],
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub credential_id: Vec<u8>,
    pub signature: Vec<u8>,
    /// authenticatorData as the backend reports it; security keys wrap it
    /// in a CBOR byte string
    pub auth_data: Vec<u8>,
}

pub trait Backend {
    /// Value of the `backend` key in JSON output
    fn name(&self) -> &'static str;

    fn enumerate_credentials(&mut self, rp_id: &str) -> Result<Vec<CredentialEntry>>;

    fn make_credential(&mut self, request: &CreateRequest<'_>) -> Result<CreatedCredential>;

    fn get_assertion(&mut self, request: &AssertRequest<'_>) -> Result<AssertionResult>;

    fn delete_credential(&mut self, credential_id: &[u8]) -> Result<()>;
}
