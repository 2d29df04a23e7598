//! Parallel vanity keypair grinding.
//!
//! This module provides:
//! - Single-threaded grind workers with cooperative cancellation
//! - A coordinator that races several workers and stops the losers
//! - The progress event stream shared by both

mod cancel;
mod coordinator;
mod cpu;
mod event;

pub use cancel::CancelToken;
pub use coordinator::{GrindCoordinator, GrindError, GrindHandle};
pub use cpu::{GrindOutcome, GrindWorker, DEFAULT_MAX_ATTEMPTS};
pub use event::GrindEvent;
