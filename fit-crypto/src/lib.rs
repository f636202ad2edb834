//! Platform-side cryptography for CTAP PIN/UV auth
//!
//! - **ECDH**: ephemeral P-256 key agreement with the authenticator
//! - **PIN protocols**: one (SHA-256 KDF, zero IV) and two (HKDF, random IV)
//!
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#sctn-pin-uv-auth-protocol>

pub mod ecdh;
pub mod error;
pub mod pin_protocol;

pub use ecdh::KeyPair;
pub use error::{CryptoError, Result};
pub use pin_protocol::{PinUvAuthProtocol, SharedSecret};
