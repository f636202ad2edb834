//! CollectedClientData for the Windows WebAuthn API

use crate::encoding::to_b64url;
use crate::error::Result;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ceremony {
    #[serde(rename = "webauthn.create")]
    Create,
    #[serde(rename = "webauthn.get")]
    Get,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    #[serde(rename = "type")]
    pub ceremony: Ceremony,
    pub challenge: String,
    pub origin: String,
    pub cross_origin: bool,
}

impl ClientData {
    pub fn new(ceremony: Ceremony, rp_id: &str, challenge: &[u8]) -> Self {
        Self {
            ceremony,
            challenge: to_b64url(challenge),
            origin: origin_for(rp_id),
            cross_origin: false,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// `https://` origin for a bare RP id; values with a scheme pass through
pub fn origin_for(rp_id: &str) -> String {
    if rp_id.contains("://") {
        rp_id.to_string()
    } else {
        format!("https://{rp_id}")
    }
}
