//! WebAuthn entities carried inside CTAP2 maps
//!
//! These are text-keyed CBOR maps. Struct fields are declared in CTAP2
//! canonical key order (shorter names first), since serde writes them in
//! declaration order.

use serde::{Deserialize, Serialize};

/// The only credential type FIDO2 defines
pub const PUBLIC_KEY: &str = "public-key";

/// COSE algorithm identifier for ECDSA P-256 with SHA-256
pub const ES256: i32 = -7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RelyingParty {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// User account entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: Vec<u8>, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            display_name: Some(display_name.into()),
        }
    }
}

/// Credential reference for allowList and credential management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,

    #[serde(rename = "type")]
    pub cred_type: String,
}

impl PublicKeyCredentialDescriptor {
    pub fn new(id: Vec<u8>) -> Self {
        Self {
            id,
            cred_type: PUBLIC_KEY.to_string(),
        }
    }
}

/// Entry of pubKeyCredParams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    pub alg: i32,

    #[serde(rename = "type")]
    pub cred_type: String,
}

impl PublicKeyCredentialParameters {
    pub fn es256() -> Self {
        Self {
            alg: ES256,
            cred_type: PUBLIC_KEY.to_string(),
        }
    }
}

/// Request options map (rk, up, uv)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rk: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv: Option<bool>,
}

impl RequestOptions {
    pub fn is_empty(&self) -> bool {
        self.rk.is_none() && self.up.is_none() && self.uv.is_none()
    }
}
