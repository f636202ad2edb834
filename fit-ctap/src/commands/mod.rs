//! CTAP2 command encoders and response parsers (platform side)
//!
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#commands>

pub mod client_pin;
pub mod credential_management;
pub mod get_assertion;
pub mod get_info;
pub mod make_credential;

/// CTAP2 command byte, sent ahead of the CBOR parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    MakeCredential = 0x01,
    GetAssertion = 0x02,
    GetInfo = 0x04,
    ClientPin = 0x06,
    Reset = 0x07,
    CredentialManagement = 0x0A,
    /// Pre-2.1 credential management, advertised as credentialMgmtPreview
    CredentialManagementPreview = 0x41,
}
