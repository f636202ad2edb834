//! Random challenges and user handles

use crate::error::{Error, Result};

use rand::RngCore;
use rand::rngs::OsRng;

/// Length of every challenge and generated user id
pub const CHALLENGE_LEN: usize = 32;

/// Source of fresh random bytes for one operation
pub trait ChallengeSource {
    fn bytes(&mut self, len: usize) -> Result<Vec<u8>>;
}

/// The operating system's secure random source
#[derive(Debug, Default, Clone, Copy)]
pub struct OsChallenge;

impl ChallengeSource for OsChallenge {
    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| Error::Randomness(e.to_string()))?;
        Ok(buf)
    }
}
