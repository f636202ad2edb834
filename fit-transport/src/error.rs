//! Errors raised while talking CTAPHID to a key

use crate::ctaphid::ErrorCode;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Malformed HID report")]
    InvalidPacket,

    /// Reply carried a channel id other than ours
    #[error("Reply on foreign channel")]
    InvalidChannel,

    #[error("Unexpected CTAPHID command in reply")]
    InvalidCommand,

    #[error("Continuation packet out of sequence")]
    InvalidSequence,

    #[error("Message exceeds CTAPHID size limit")]
    MessageTooLarge,

    /// Continuation packets stopped before the announced length
    #[error("Reply truncated")]
    Truncated,

    #[error("Timed out waiting for the device")]
    Timeout,

    #[error("CTAPHID {0}")]
    Device(ErrorCode),

    #[error("Device not found")]
    DeviceNotFound,

    /// hidapi or OS level failure, already formatted
    #[error("HID I/O error: {0}")]
    Hid(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Hid(err.to_string())
    }
}
