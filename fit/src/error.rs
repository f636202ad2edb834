//! Error types for the fit tool

use fit_ctap::StatusCode;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `--cred-id-hex` or `--cred-id-b64` did not decode
    #[error("Invalid {flag}: {reason}")]
    InvalidCredentialId { flag: &'static str, reason: String },

    #[error("--cred-index out of range (have {have})")]
    CredentialIndexOutOfRange { have: usize },

    #[error("Invalid device index: {0}")]
    InvalidDeviceIndex(i64),

    /// Unusable answer at the interactive device prompt
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("No FIDO2 devices found.")]
    NoDevices,

    /// An operation needs a PIN that was not supplied
    #[error("{0} requires --pin")]
    PinRequired(&'static str),

    /// A security key assertion needs an allowList entry
    #[error("no credential selected for the assertion")]
    CredentialRequired,

    #[error(transparent)]
    Ctap(#[from] fit_ctap::Error),

    #[error(transparent)]
    Transport(#[from] fit_transport::Error),

    /// Failure reported by the Windows WebAuthn API
    #[error("{0}")]
    Platform(String),

    /// The OS random source failed; the process must not continue
    #[error("secure random source failed: {0}")]
    Randomness(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// CTAP status byte behind this error, when the authenticator sent one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Ctap(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_randomness(&self) -> bool {
        matches!(self, Error::Randomness(_))
    }
}
