//! PIN/UV auth protocols one and two (platform side)
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#sctn-pin-uv-auth-protocol-one>
//!
//! Protocol one: shared secret SHA-256(Z), AES-256-CBC with a zero IV,
//! HMAC-SHA-256 truncated to 16 bytes.
//! Protocol two: HKDF-derived HMAC and AES keys, AES-256-CBC with a random
//! IV prepended to the ciphertext, full 32-byte HMAC-SHA-256.
//!
//! Neither protocol pads: every plaintext must be a whole number of AES
//! blocks, which CTAP guarantees for PINs (padded to 64 bytes), PIN hashes
//! (16 bytes), and tokens (16 or 32 bytes).

use crate::error::{CryptoError, Result};

use aes::Aes256;
use cbc::{
    Decryptor, Encryptor,
    cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding},
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

const BLOCK_SIZE: usize = 16;

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::KeyLength {
        expected: 32,
        actual: key.len(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

fn cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Encrypt);
    }
    let mut buffer = plaintext.to_vec();
    Aes256CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buffer, plaintext.len())
        .map_err(|_| CryptoError::Encrypt)?;
    Ok(buffer)
}

fn cbc_decrypt(key: &[u8; 32], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Decrypt);
    }
    let mut buffer = ciphertext.to_vec();
    let len = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| CryptoError::Decrypt)?
        .len();
    buffer.truncate(len);
    Ok(buffer)
}

/// PIN/UV auth protocol one
pub mod v1 {
    use super::*;

    /// Derive the shared secret: SHA-256 of the ECDH x-coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::pin_protocol::v1;
    ///
    /// let secret = v1::kdf(&[0x42u8; 32]);
    /// assert_eq!(secret.len(), 32);
    /// ```
    pub fn kdf(z: &[u8; 32]) -> [u8; 32] {
        Sha256::digest(z).into()
    }

    /// AES-256-CBC with a zero IV, no padding
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::pin_protocol::v1;
    ///
    /// let key = [0x42u8; 32];
    /// let ciphertext = v1::encrypt(&key, &[0u8; 16]).unwrap();
    /// assert_eq!(ciphertext.len(), 16);
    /// assert!(v1::encrypt(&key, b"not a block").is_err());
    /// ```
    pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
        cbc_encrypt(key, &[0u8; 16], plaintext)
    }

    pub fn decrypt(key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>> {
        cbc_decrypt(key, &[0u8; 16], ciphertext)
    }

    /// First 16 bytes of HMAC-SHA-256
    ///
    /// `key` is the shared secret or a pinUvAuthToken (16 or 32 bytes).
    pub fn authenticate(key: &[u8], data: &[u8]) -> Result<[u8; 16]> {
        let mac = hmac_sha256(key, data)?;
        let mut out = [0u8; 16];
        out.copy_from_slice(&mac[..16]);
        Ok(out)
    }
}

/// PIN/UV auth protocol two
pub mod v2 {
    use super::*;

    use hkdf::Hkdf;

    fn hkdf_sha256(z: &[u8; 32], info: &[u8]) -> Result<[u8; 32]> {
        let salt = [0u8; 32];
        let mut key = [0u8; 32];
        Hkdf::<Sha256>::new(Some(&salt[..]), z)
            .expand(info, &mut key)
            .map_err(|_| CryptoError::SharedSecret)?;
        Ok(key)
    }

    /// Derive `(hmac_key, aes_key)` from the ECDH x-coordinate
    ///
    /// HKDF-SHA-256 with 32 zero bytes of salt and the infos
    /// "CTAP2 HMAC key" and "CTAP2 AES key".
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::pin_protocol::v2;
    ///
    /// let (hmac_key, aes_key) = v2::kdf(&[0x42u8; 32]).unwrap();
    /// assert_ne!(hmac_key, aes_key);
    /// ```
    pub fn kdf(z: &[u8; 32]) -> Result<([u8; 32], [u8; 32])> {
        Ok((
            hkdf_sha256(z, b"CTAP2 HMAC key")?,
            hkdf_sha256(z, b"CTAP2 AES key")?,
        ))
    }

    /// AES-256-CBC with a fresh random IV, returned as `IV || ciphertext`
    pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
        let iv: [u8; 16] = rand::random();
        let mut out = iv.to_vec();
        out.extend(cbc_encrypt(key, &iv, plaintext)?);
        Ok(out)
    }

    /// Inverse of [`encrypt`]
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::pin_protocol::v2;
    ///
    /// let key = [7u8; 32];
    /// let sealed = v2::encrypt(&key, &[1u8; 32]).unwrap();
    /// assert_eq!(sealed.len(), 48);
    /// assert_eq!(v2::decrypt(&key, &sealed).unwrap(), vec![1u8; 32]);
    /// ```
    pub fn decrypt(key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < BLOCK_SIZE {
            return Err(CryptoError::Decrypt);
        }
        let (iv, body) = ciphertext.split_at(BLOCK_SIZE);
        let mut iv_block = [0u8; 16];
        iv_block.copy_from_slice(iv);
        cbc_decrypt(key, &iv_block, body)
    }

    /// Full 32-byte HMAC-SHA-256
    pub fn authenticate(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
        hmac_sha256(key, data)
    }
}

/// Negotiated PIN/UV auth protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinUvAuthProtocol {
    One,
    Two,
}

impl PinUvAuthProtocol {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Turn the ECDH x-coordinate into this protocol's shared secret
    pub fn shared_secret(self, z: &[u8; 32]) -> Result<SharedSecret> {
        Ok(match self {
            Self::One => {
                let key = v1::kdf(z);
                SharedSecret {
                    protocol: self,
                    hmac_key: key,
                    aes_key: key,
                }
            }
            Self::Two => {
                let (hmac_key, aes_key) = v2::kdf(z)?;
                SharedSecret {
                    protocol: self,
                    hmac_key,
                    aes_key,
                }
            }
        })
    }

    /// pinUvAuthParam over `data` keyed by a pinUvAuthToken
    pub fn authenticate(self, token: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        Ok(match self {
            Self::One => v1::authenticate(token, data)?.to_vec(),
            Self::Two => v2::authenticate(token, data)?.to_vec(),
        })
    }
}

/// Keys shared with the authenticator after key agreement
pub struct SharedSecret {
    protocol: PinUvAuthProtocol,
    hmac_key: [u8; 32],
    aes_key: [u8; 32],
}

impl SharedSecret {
    pub fn protocol(&self) -> PinUvAuthProtocol {
        self.protocol
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.protocol {
            PinUvAuthProtocol::One => v1::encrypt(&self.aes_key, plaintext),
            PinUvAuthProtocol::Two => v2::encrypt(&self.aes_key, plaintext),
        }
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.protocol {
            PinUvAuthProtocol::One => v1::decrypt(&self.aes_key, ciphertext),
            PinUvAuthProtocol::Two => v2::decrypt(&self.aes_key, ciphertext),
        }
    }

    /// pinUvAuthParam keyed by the shared secret (setPIN / changePIN)
    pub fn authenticate(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.protocol.authenticate(&self.hmac_key, data)
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.hmac_key.zeroize();
        self.aes_key.zeroize();
    }
}

/// Pad a PIN to the 64 bytes the authenticator expects
///
/// Returns `None` when the PIN is longer than 63 bytes.
pub fn pad_pin(pin: &str) -> Option<[u8; 64]> {
    let bytes = pin.as_bytes();
    if bytes.len() > 63 {
        return None;
    }
    let mut padded = [0u8; 64];
    padded[..bytes.len()].copy_from_slice(bytes);
    Some(padded)
}

/// LEFT(SHA-256(pin), 16), the value sent as pinHashEnc
pub fn pin_hash(pin: &str) -> [u8; 16] {
    let digest = Sha256::digest(pin.as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}
