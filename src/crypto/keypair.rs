//! Solana (Ed25519) keypair generation.

use std::fmt;

use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Length of the serialized secret material: 32-byte seed followed by the 32-byte public key.
pub const SECRET_MATERIAL_LEN: usize = KEYPAIR_LENGTH;

/// Shortest base-58 rendering of a 32-byte public key.
pub const MIN_IDENTIFIER_LEN: usize = 32;

/// Longest base-58 rendering of a 32-byte public key.
pub const MAX_IDENTIFIER_LEN: usize = 44;

/// Errors raised when rebuilding a keypair from stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeypairError {
    #[error("secret material must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("public half of the secret material does not match its seed")]
    MismatchedPublicKey,
}

/// An Ed25519 keypair together with its base-58 public identifier.
///
/// The identifier is always derived from the signing key; the two are never
/// set independently.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    public_identifier: String,
}

impl Keypair {
    /// Generates a new random keypair from the operating system's entropy source.
    #[inline]
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generates a new random keypair from the given cryptographically secure RNG.
    #[inline]
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_signing_key(SigningKey::generate(rng))
    }

    /// Rebuilds a keypair from its 64-byte secret material.
    ///
    /// Fails if the length is wrong or the embedded public key does not belong
    /// to the seed.
    pub fn from_secret_material(bytes: &[u8]) -> Result<Self, KeypairError> {
        let bytes: &[u8; SECRET_MATERIAL_LEN] =
            bytes.try_into().map_err(|_| KeypairError::InvalidLength {
                expected: SECRET_MATERIAL_LEN,
                actual: bytes.len(),
            })?;

        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| KeypairError::MismatchedPublicKey)?;

        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_identifier = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self {
            signing_key,
            public_identifier,
        }
    }

    /// Returns the base-58 public identifier (the Solana address).
    #[inline]
    pub fn public_identifier(&self) -> &str {
        &self.public_identifier
    }

    /// Returns the 64-byte secret material, wiped when dropped.
    pub fn secret_material(&self) -> Zeroizing<[u8; SECRET_MATERIAL_LEN]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_identifier", &self.public_identifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 8032 section 7.1, test 1.
    const SEED: [u8; 32] = [
        0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c,
        0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae,
        0x7f, 0x60,
    ];

    #[test]
    fn test_keypair_generation() {
        let keypair = Keypair::generate();
        let len = keypair.public_identifier().len();
        assert!((MIN_IDENTIFIER_LEN..=MAX_IDENTIFIER_LEN).contains(&len));
        assert_eq!(keypair.secret_material().len(), SECRET_MATERIAL_LEN);
    }

    #[test]
    fn test_deterministic_identifier() {
        let keypair = Keypair::from_signing_key(SigningKey::from_bytes(&SEED));
        assert_eq!(
            keypair.public_identifier(),
            "FVen3X669xLzsi6N2V91DoiyzHzg1uAgqiT8jZ9nS96Z"
        );
    }

    #[test]
    fn test_secret_material_rebuilds_same_keypair() {
        let keypair = Keypair::generate();
        let rebuilt = Keypair::from_secret_material(keypair.secret_material().as_slice()).unwrap();
        assert_eq!(rebuilt.public_identifier(), keypair.public_identifier());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = Keypair::from_secret_material(&[0u8; 63]).unwrap_err();
        assert_eq!(
            err,
            KeypairError::InvalidLength {
                expected: 64,
                actual: 63
            }
        );
    }

    #[test]
    fn test_mismatched_public_half_rejected() {
        let mut bytes = *Keypair::generate().secret_material();
        let other = Keypair::generate().secret_material();
        bytes[32..].copy_from_slice(&other[32..]);
        assert_eq!(
            Keypair::from_secret_material(&bytes).unwrap_err(),
            KeypairError::MismatchedPublicKey
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::generate();
        let rendered = format!("{:?}", keypair);
        assert!(rendered.contains(keypair.public_identifier()));
        assert!(!rendered.contains("signing_key"));
    }
}
