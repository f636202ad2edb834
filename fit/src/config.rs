//! Run configuration
//!
//! Built from defaults, then adjusted from global command line flags:
//!
//! ```
//! use fit::config::{Config, OutputMode};
//!
//! let config = Config::new().with_output(OutputMode::Json).with_verbose(true);
//! assert!(config.is_json());
//! ```

use crate::challenge::CHALLENGE_LEN;

use std::time::Duration;

/// Output rendering selected by `--json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputMode,

    /// Raise the log filter to debug
    pub verbose: bool,

    /// How long an assertion may wait for the user
    pub assertion_timeout: Duration,

    /// How long credential creation may wait for the user
    pub creation_timeout: Duration,

    pub challenge_len: usize,

    /// User name when `--user` is not given
    pub default_user: String,

    /// User handle for Windows Hello passkeys
    pub hello_user_id: Vec<u8>,

    /// Resident-key option for the credential minted by `auth --create`
    pub transient_resident_key: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputMode::Text,
            verbose: false,
            assertion_timeout: Duration::from_secs(30),
            creation_timeout: Duration::from_secs(45),
            challenge_len: CHALLENGE_LEN,
            default_user: "fit-user".to_string(),
            hello_user_id: b"user-id-012345678901234567890123".to_vec(),
            transient_resident_key: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_assertion_timeout(mut self, timeout: Duration) -> Self {
        self.assertion_timeout = timeout;
        self
    }

    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }

    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    pub fn with_transient_resident_key(mut self, resident: bool) -> Self {
        self.transient_resident_key = resident;
        self
    }

    pub fn is_json(&self) -> bool {
        self.output == OutputMode::Json
    }
}
