//! Cryptographic operations for Solana vanity keypairs.
//!
//! This module provides:
//! - Secure random Ed25519 key generation with base-58 identifiers
//! - At-rest encryption of secret material for the pool

mod cipher;
mod keypair;

pub use cipher::{CipherError, SecretCipher, MIN_SECRET_LEN};
pub use keypair::{
    Keypair, KeypairError, MAX_IDENTIFIER_LEN, MIN_IDENTIFIER_LEN, SECRET_MATERIAL_LEN,
};
