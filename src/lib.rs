//! # solvanity_pool
//!
//! Solana vanity keypair grinding and a shared pool of pre-ground keypairs.
//!
//! ## Architecture
//!
//! - `crypto`: Ed25519 key generation and at-rest secret encryption
//! - `matcher`: Suffix normalization and case-insensitive matching
//! - `worker`: Parallel, cancellable grinding
//! - `pool`: Encrypted keypair inventory with claim-once semantics
//! - `web`: HTTP surface for donate and claim
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod matcher;
pub mod pool;
pub mod web;
pub mod worker;

pub use config::AppConfig;
pub use crypto::{Keypair, SecretCipher};
pub use error::{AppError, AppResult};
pub use matcher::SuffixTarget;
pub use pool::{ClaimOutcome, PoolError, PoolService, PoolStore, SqlitePoolStore};
pub use worker::{CancelToken, GrindCoordinator, GrindError, GrindEvent, GrindHandle};
