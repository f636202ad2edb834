//! CTAP2 status codes
//!
//! The first byte of every CTAPHID_CBOR response.
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#error-responses>

use core::fmt;

/// Status byte returned by the authenticator
///
/// Bytes without a variant of their own map to [`StatusCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Success = 0x00,
    InvalidCommand = 0x01,
    InvalidParameter = 0x02,
    InvalidLength = 0x03,
    InvalidSeq = 0x04,
    Timeout = 0x05,
    ChannelBusy = 0x06,
    LockRequired = 0x0A,
    InvalidChannel = 0x0B,
    CborUnexpectedType = 0x11,
    InvalidCbor = 0x12,
    MissingParameter = 0x14,
    LimitExceeded = 0x15,
    UnsupportedExtension = 0x16,
    CredentialExcluded = 0x19,
    Processing = 0x21,
    InvalidCredential = 0x22,
    UserActionPending = 0x23,
    OperationPending = 0x24,
    NoOperations = 0x25,
    UnsupportedAlgorithm = 0x26,
    OperationDenied = 0x27,
    KeyStoreFull = 0x28,
    NotBusy = 0x29,
    NoOperationPending = 0x2A,
    UnsupportedOption = 0x2B,
    InvalidOption = 0x2C,
    KeepaliveCancel = 0x2D,
    NoCredentials = 0x2E,
    UserActionTimeout = 0x2F,
    NotAllowed = 0x30,
    PinInvalid = 0x31,
    PinBlocked = 0x32,
    PinAuthInvalid = 0x33,
    PinAuthBlocked = 0x34,
    PinNotSet = 0x35,
    PinRequired = 0x36,
    PinPolicyViolation = 0x37,
    PinTokenExpired = 0x38,
    RequestTooLarge = 0x39,
    ActionTimeout = 0x3A,
    UpRequired = 0x3B,
    UvBlocked = 0x3C,
    IntegrityFailure = 0x3D,
    InvalidSubcommand = 0x3E,
    UvInvalid = 0x3F,
    UnauthorizedPermission = 0x40,
    PuatRequired = 0x41,
    Other = 0x7F,
}

/// Every status with its CTAP 2.1 name
const NAMES: &[(StatusCode, &str)] = &[
    (StatusCode::Success, "CTAP2_OK"),
    (StatusCode::InvalidCommand, "CTAP1_ERR_INVALID_COMMAND"),
    (StatusCode::InvalidParameter, "CTAP1_ERR_INVALID_PARAMETER"),
    (StatusCode::InvalidLength, "CTAP1_ERR_INVALID_LENGTH"),
    (StatusCode::InvalidSeq, "CTAP1_ERR_INVALID_SEQ"),
    (StatusCode::Timeout, "CTAP1_ERR_TIMEOUT"),
    (StatusCode::ChannelBusy, "CTAP1_ERR_CHANNEL_BUSY"),
    (StatusCode::LockRequired, "CTAP1_ERR_LOCK_REQUIRED"),
    (StatusCode::InvalidChannel, "CTAP1_ERR_INVALID_CHANNEL"),
    (StatusCode::CborUnexpectedType, "CTAP2_ERR_CBOR_UNEXPECTED_TYPE"),
    (StatusCode::InvalidCbor, "CTAP2_ERR_INVALID_CBOR"),
    (StatusCode::MissingParameter, "CTAP2_ERR_MISSING_PARAMETER"),
    (StatusCode::LimitExceeded, "CTAP2_ERR_LIMIT_EXCEEDED"),
    (StatusCode::UnsupportedExtension, "CTAP2_ERR_UNSUPPORTED_EXTENSION"),
    (StatusCode::CredentialExcluded, "CTAP2_ERR_CREDENTIAL_EXCLUDED"),
    (StatusCode::Processing, "CTAP2_ERR_PROCESSING"),
    (StatusCode::InvalidCredential, "CTAP2_ERR_INVALID_CREDENTIAL"),
    (StatusCode::UserActionPending, "CTAP2_ERR_USER_ACTION_PENDING"),
    (StatusCode::OperationPending, "CTAP2_ERR_OPERATION_PENDING"),
    (StatusCode::NoOperations, "CTAP2_ERR_NO_OPERATIONS"),
    (StatusCode::UnsupportedAlgorithm, "CTAP2_ERR_UNSUPPORTED_ALGORITHM"),
    (StatusCode::OperationDenied, "CTAP2_ERR_OPERATION_DENIED"),
    (StatusCode::KeyStoreFull, "CTAP2_ERR_KEY_STORE_FULL"),
    (StatusCode::NotBusy, "CTAP2_ERR_NOT_BUSY"),
    (StatusCode::NoOperationPending, "CTAP2_ERR_NO_OPERATION_PENDING"),
    (StatusCode::UnsupportedOption, "CTAP2_ERR_UNSUPPORTED_OPTION"),
    (StatusCode::InvalidOption, "CTAP2_ERR_INVALID_OPTION"),
    (StatusCode::KeepaliveCancel, "CTAP2_ERR_KEEPALIVE_CANCEL"),
    (StatusCode::NoCredentials, "CTAP2_ERR_NO_CREDENTIALS"),
    (StatusCode::UserActionTimeout, "CTAP2_ERR_USER_ACTION_TIMEOUT"),
    (StatusCode::NotAllowed, "CTAP2_ERR_NOT_ALLOWED"),
    (StatusCode::PinInvalid, "CTAP2_ERR_PIN_INVALID"),
    (StatusCode::PinBlocked, "CTAP2_ERR_PIN_BLOCKED"),
    (StatusCode::PinAuthInvalid, "CTAP2_ERR_PIN_AUTH_INVALID"),
    (StatusCode::PinAuthBlocked, "CTAP2_ERR_PIN_AUTH_BLOCKED"),
    (StatusCode::PinNotSet, "CTAP2_ERR_PIN_NOT_SET"),
    (StatusCode::PinRequired, "CTAP2_ERR_PIN_REQUIRED"),
    (StatusCode::PinPolicyViolation, "CTAP2_ERR_PIN_POLICY_VIOLATION"),
    (StatusCode::PinTokenExpired, "CTAP2_ERR_PIN_TOKEN_EXPIRED"),
    (StatusCode::RequestTooLarge, "CTAP2_ERR_REQUEST_TOO_LARGE"),
    (StatusCode::ActionTimeout, "CTAP2_ERR_ACTION_TIMEOUT"),
    (StatusCode::UpRequired, "CTAP2_ERR_UP_REQUIRED"),
    (StatusCode::UvBlocked, "CTAP2_ERR_UV_BLOCKED"),
    (StatusCode::IntegrityFailure, "CTAP2_ERR_INTEGRITY_FAILURE"),
    (StatusCode::InvalidSubcommand, "CTAP2_ERR_INVALID_SUBCOMMAND"),
    (StatusCode::UvInvalid, "CTAP2_ERR_UV_INVALID"),
    (StatusCode::UnauthorizedPermission, "CTAP2_ERR_UNAUTHORIZED_PERMISSION"),
    (StatusCode::PuatRequired, "CTAP2_ERR_PUAT_REQUIRED"),
    (StatusCode::Other, "CTAP1_ERR_OTHER"),
];

impl StatusCode {
    pub fn from_u8(value: u8) -> Self {
        NAMES
            .iter()
            .map(|(code, _)| *code)
            .find(|code| *code as u8 == value)
            .unwrap_or(Self::Other)
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Name such as `CTAP2_ERR_PIN_INVALID`
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
            .unwrap_or("CTAP1_ERR_OTHER")
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Errors caused by a wrong or missing PIN rather than by the device
    pub fn is_pin_error(self) -> bool {
        matches!(
            self,
            Self::PinInvalid
                | Self::PinBlocked
                | Self::PinAuthInvalid
                | Self::PinAuthBlocked
                | Self::PinNotSet
                | Self::PinRequired
                | Self::PinPolicyViolation
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.to_u8())
    }
}

impl From<u8> for StatusCode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}
