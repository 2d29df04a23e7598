//! At-rest encryption of keypair secret material.
//!
//! Blobs are `base64(nonce || ciphertext)` under ChaCha20-Poly1305, keyed by a
//! BLAKE3 derivation of the configured secret.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Minimum length of the configured secret.
pub const MIN_SECRET_LEN: usize = 16;

const KEY_CONTEXT: &str = "solvanity-pool 2026-10 vanity secret at-rest key";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Cipher errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("encryption secret must be at least {} characters", MIN_SECRET_LEN)]
    WeakSecret,

    #[error("Decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,
}

/// Symmetric codec for secret material stored in the pool.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: ChaCha20Poly1305,
}

impl SecretCipher {
    /// Derives the process-wide key from a configured secret.
    pub fn from_secret(secret: &str) -> Result<Self, CipherError> {
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(CipherError::WeakSecret);
        }
        let key = Zeroizing::new(blake3::derive_key(KEY_CONTEXT, secret.as_bytes()));
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key[..])),
        })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypts a blob produced by [`SecretCipher::encrypt`].
    ///
    /// Malformed, truncated, tampered or foreign-key blobs all yield
    /// [`CipherError::DecryptionFailed`].
    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        let raw = BASE64
            .decode(blob.trim())
            .map_err(|_| CipherError::DecryptionFailed)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed);
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretCipher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cipher() -> SecretCipher {
        SecretCipher::from_secret("a-test-secret-that-is-long-enough").unwrap()
    }

    #[test]
    fn test_short_secret_rejected() {
        assert_eq!(
            SecretCipher::from_secret("short").unwrap_err(),
            CipherError::WeakSecret
        );
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let c = cipher();
        assert_ne!(c.encrypt(b"same").unwrap(), c.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = cipher().encrypt(&[7u8; 64]).unwrap();
        let other = SecretCipher::from_secret("another-secret-also-long-enough").unwrap();
        assert_eq!(other.decrypt(&blob).unwrap_err(), CipherError::DecryptionFailed);
    }

    #[test]
    fn test_tampered_blob_fails() {
        let c = cipher();
        let mut raw = BASE64.decode(c.encrypt(&[7u8; 64]).unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert_eq!(
            c.decrypt(&BASE64.encode(raw)).unwrap_err(),
            CipherError::DecryptionFailed
        );
    }

    #[test]
    fn test_garbage_and_truncated_fail() {
        let c = cipher();
        assert!(c.decrypt("not base64 at all!").is_err());
        assert!(c.decrypt(&BASE64.encode([0u8; 20])).is_err());
        assert!(c.decrypt("").is_err());
    }

    proptest! {
        #[test]
        fn test_decrypt_inverts_encrypt(secret in proptest::collection::vec(any::<u8>(), 64)) {
            let c = cipher();
            let blob = c.encrypt(&secret).unwrap();
            let plain = c.decrypt(&blob).unwrap();
            prop_assert_eq!(plain.as_slice(), secret.as_slice());
        }
    }
}
