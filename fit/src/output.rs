//! JSON reports
//!
//! One flat object per command, pretty-printed with two-space indentation
//! on stdout. Binary values are hex or base64url strings.

use crate::error::Result;

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

pub fn write_json<W: Write, T: Serialize>(out: &mut W, report: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct DeviceListReport {
    pub backend: &'static str,
    pub devices: Vec<DeviceReport>,
}

#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub index: usize,
    pub label: String,
    pub vid: u16,
    pub pid: u16,
    pub path: String,
}

/// Security key `auth`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAssertionReport {
    pub backend: &'static str,
    pub rp: String,
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    pub signature: String,
    pub challenge_hex: String,
    pub challenge_b64: String,
    #[serde(rename = "authDataCBOR", skip_serializing_if = "Option::is_none")]
    pub auth_data_cbor: Option<String>,
}

/// Security key `add-passkey`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCredentialReport {
    pub backend: &'static str,
    pub rp: String,
    pub user: String,
    pub resident: bool,
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    pub challenge_hex: String,
    pub challenge_b64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoReport {
    pub backend: &'static str,
    #[serde(rename = "type")]
    pub device_type: &'static str,
    #[serde(rename = "isFIDO2")]
    pub is_fido2: bool,
    pub versions: Vec<String>,
    pub extensions: Vec<String>,
    #[serde(rename = "ctapHID", skip_serializing_if = "Option::is_none")]
    pub ctap_hid: Option<CtapHidReport>,
    pub options: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_keys: Option<ResidentKeysReport>,
}

#[derive(Debug, Serialize)]
pub struct CtapHidReport {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub flags: u8,
}

#[derive(Debug, Serialize)]
pub struct ResidentKeysReport {
    pub existing: u32,
    pub remaining: u32,
}

/// Hello `list`
#[derive(Debug, Serialize)]
pub struct HelloListReport {
    pub backend: &'static str,
    pub rp: String,
    pub credentials: Vec<HelloCredentialEntry>,
}

/// Hello `test`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloTestReport {
    pub backend: &'static str,
    pub rp: String,
    pub api_version: u32,
    pub credentials: Vec<HelloCredentialEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloCredentialEntry {
    /// Present in `list`, omitted in `test`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub rp: String,
    pub user: String,
    pub removable: bool,
    pub backed_up: bool,
    #[serde(rename = "credID")]
    pub cred_id: String,
}

/// Hello `auth`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloAssertionReport {
    pub backend: &'static str,
    pub rp: String,
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    pub signature: String,
    pub challenge_b64: String,
    pub challenge_hex: String,
}

/// Hello `add-passkey`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloCredentialReport {
    pub backend: &'static str,
    pub rp: String,
    pub user: String,
    pub resident: bool,
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    pub challenge_b64: String,
    pub challenge_hex: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteReport {
    pub backend: &'static str,
    pub deleted: bool,
    #[serde(rename = "credID")]
    pub cred_id: String,
}
