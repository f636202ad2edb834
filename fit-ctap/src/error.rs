//! Errors from a CTAP2 exchange

use crate::status::StatusCode;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The authenticator answered with a non-zero status byte
    #[error("authenticator returned {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] fit_transport::Error),

    #[error("PIN protocol error: {0}")]
    Crypto(#[from] fit_crypto::CryptoError),

    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// Response is not the CBOR the command defines
    #[error("malformed response: {0}")]
    Malformed(String),

    /// getInfo does not advertise what the operation needs
    #[error("authenticator does not support {0}")]
    Unsupported(&'static str),

    #[error("PIN must be at most 63 bytes")]
    PinTooLong,
}

impl Error {
    /// CTAP status behind this error, when the device produced one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<StatusCode> for Error {
    fn from(code: StatusCode) -> Self {
        Self::Status(code)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
