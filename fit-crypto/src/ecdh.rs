//! P-256 ECDH for PIN/UV auth key agreement
//!
//! The platform generates an ephemeral key pair per PIN operation, sends its
//! public half as a COSE_Key, and combines its secret with the
//! authenticator's keyAgreement key. The shared point's x-coordinate (Z) is
//! the input to the protocol KDF.
//!
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#sctn-pin-uv-auth-protocol-one>

use crate::error::{CryptoError, Result};

use p256::{PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};
use rand::rngs::OsRng;

const UNCOMPRESSED_LEN: usize = 65;

/// Ephemeral P-256 key pair
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS RNG
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::ecdh::KeyPair;
    ///
    /// let keypair = KeyPair::generate();
    /// let (x, y) = keypair.public_key_cose();
    /// assert_ne!(x, y);
    /// ```
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Public key as the (x, y) pair of a COSE_Key (kty 2, alg -25, crv 1)
    pub fn public_key_cose(&self) -> ([u8; 32], [u8; 32]) {
        let point = self.public.to_encoded_point(false);
        let bytes = point.as_bytes();

        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&bytes[1..33]);
        y.copy_from_slice(&bytes[33..65]);
        (x, y)
    }

    /// Uncompressed SEC1 encoding (0x04 || x || y)
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_encoded_point(false).as_bytes().to_vec()
    }

    /// ECDH with the authenticator's COSE key coordinates
    ///
    /// Returns Z, the x-coordinate of the shared point.
    ///
    /// # Examples
    ///
    /// ```
    /// use fit_crypto::ecdh::KeyPair;
    ///
    /// let platform = KeyPair::generate();
    /// let authenticator = KeyPair::generate();
    ///
    /// let (ax, ay) = authenticator.public_key_cose();
    /// let (px, py) = platform.public_key_cose();
    /// assert_eq!(
    ///     platform.shared_secret_cose(&ax, &ay).unwrap(),
    ///     authenticator.shared_secret_cose(&px, &py).unwrap()
    /// );
    /// ```
    pub fn shared_secret_cose(&self, x: &[u8], y: &[u8]) -> Result<[u8; 32]> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::MalformedKeyAgreement);
        }
        let mut sec1 = Vec::with_capacity(UNCOMPRESSED_LEN);
        sec1.push(0x04);
        sec1.extend_from_slice(x);
        sec1.extend_from_slice(y);
        self.shared_secret(&sec1)
    }

    /// ECDH with a peer key in uncompressed SEC1 form
    pub fn shared_secret(&self, peer_public_key: &[u8]) -> Result<[u8; 32]> {
        let peer_public = PublicKey::from_sec1_bytes(peer_public_key)
            .map_err(|_| CryptoError::KeyNotOnCurve)?;

        let shared =
            p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer_public.as_affine());

        let mut z = [0u8; 32];
        z.copy_from_slice(shared.raw_secret_bytes());
        Ok(z)
    }
}
