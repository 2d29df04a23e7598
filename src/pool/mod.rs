//! The shared pool of pre-ground vanity keypairs.
//!
//! - `store`: durable storage with an atomic take-oldest
//! - `service`: validation, encryption and the claim/donate entry points

mod service;
mod store;

pub use service::{ClaimOutcome, PoolError, PoolService};
pub use store::{init_db, DbPool, PoolStore, PooledEntry, SqlitePoolStore, StoreResult};
