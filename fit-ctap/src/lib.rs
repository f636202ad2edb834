//! CTAP2 client for the fit FIDO2 tool
//!
//! Encodes platform requests, parses authenticator responses, and runs
//! whole operations over a CTAPHID channel:
//! - getInfo, makeCredential, getAssertion, reset
//! - clientPIN with PIN/UV auth protocols one and two
//! - credential management (metadata, enumeration, deletion)
//!
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html>

pub mod cbor;
pub mod commands;
pub mod device;
pub mod error;
pub mod status;
pub mod types;

pub use commands::credential_management::{CredentialsMetadata, ResidentCredential};
pub use commands::get_assertion::Assertion;
pub use commands::get_info::AuthenticatorInfo;
pub use commands::make_credential::{Attestation, AuthenticatorData};
pub use device::{CredentialOptions, Device, PinToken};
pub use error::{Error, Result};
pub use status::StatusCode;
pub use types::{PublicKeyCredentialDescriptor, RelyingParty, User};
