//! Failures in the platform half of the PIN/UV auth protocol

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// keyAgreement map is missing fields or has wrongly sized coordinates
    #[error("Malformed authenticator keyAgreement")]
    MalformedKeyAgreement,

    /// Coordinates do not name a point on P-256
    #[error("Authenticator key is not on P-256")]
    KeyNotOnCurve,

    #[error("Could not derive shared secret")]
    SharedSecret,

    #[error("PIN encryption failed")]
    Encrypt,

    #[error("Could not decrypt authenticator reply")]
    Decrypt,

    #[error("HMAC key must be {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },
}

pub type Result<T> = core::result::Result<T, CryptoError>;
