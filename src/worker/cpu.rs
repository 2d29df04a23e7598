//! CPU-based grind worker.

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::crypto::Keypair;
use crate::matcher::SuffixTarget;

use super::{CancelToken, GrindEvent};

/// Default per-invocation attempt bound; effectively unbounded for suffixes of up to 8 characters.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 1_000_000_000;

/// Attempts between cancellation checks.
const CANCEL_CHECK_BATCH: u64 = 64;

/// How a single grind invocation ended.
#[derive(Debug, Clone)]
pub enum GrindOutcome {
    /// A keypair whose identifier ends with the target.
    Found { keypair: Keypair, attempts: u64 },
    /// The cancel signal was raised first.
    Cancelled { attempts: u64 },
    /// The attempt bound was reached without a match.
    Exhausted { attempts: u64 },
}

impl GrindOutcome {
    /// Returns the number of keypairs generated.
    pub fn attempts(&self) -> u64 {
        match self {
            GrindOutcome::Found { attempts, .. }
            | GrindOutcome::Cancelled { attempts }
            | GrindOutcome::Exhausted { attempts } => *attempts,
        }
    }

    /// Returns the matching keypair, if any.
    pub fn into_keypair(self) -> Option<Keypair> {
        match self {
            GrindOutcome::Found { keypair, .. } => Some(keypair),
            _ => None,
        }
    }
}

impl From<GrindOutcome> for GrindEvent {
    fn from(outcome: GrindOutcome) -> Self {
        match outcome {
            GrindOutcome::Found { keypair, attempts } => GrindEvent::Result { keypair, attempts },
            GrindOutcome::Cancelled { attempts } => GrindEvent::Cancelled { attempts },
            GrindOutcome::Exhausted { attempts } => GrindEvent::Exhausted { attempts },
        }
    }
}

/// A worker that generates and tests keypairs until one matches.
///
/// Each call to [`GrindWorker::grind`] seeds its own RNG, so workers share no
/// mutable state.
#[derive(Debug, Clone)]
pub struct GrindWorker {
    /// Worker ID
    id: usize,
    /// Upper bound on attempts per invocation
    max_attempts: u64,
}

impl GrindWorker {
    /// Creates a new worker with the default attempt bound.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Runs the grind loop.
    ///
    /// Generates keypairs and tests them against `target` until:
    /// - A match is found
    /// - `cancel` is raised (checked every few attempts)
    /// - The attempt bound is reached
    ///
    /// When `report_interval > 0`, a progress event is sent on `progress`
    /// after every `report_interval` attempts. Progress is best-effort; a
    /// closed channel does not stop the search.
    pub fn grind(
        &self,
        target: &SuffixTarget,
        report_interval: u64,
        cancel: &CancelToken,
        progress: Option<&Sender<GrindEvent>>,
    ) -> GrindOutcome {
        let mut rng = StdRng::from_entropy();
        let mut attempts = 0u64;

        while attempts < self.max_attempts {
            if attempts % CANCEL_CHECK_BATCH == 0 && cancel.is_cancelled() {
                tracing::debug!(worker = self.id, attempts, "grind cancelled");
                return GrindOutcome::Cancelled { attempts };
            }

            let keypair = Keypair::generate_with(&mut rng);
            attempts += 1;

            if target.matches(keypair.public_identifier()) {
                tracing::debug!(
                    worker = self.id,
                    attempts,
                    identifier = keypair.public_identifier(),
                    "grind matched"
                );
                return GrindOutcome::Found { keypair, attempts };
            }

            if report_interval > 0 && attempts % report_interval == 0 {
                if let Some(tx) = progress {
                    let _ = tx.try_send(GrindEvent::Progress {
                        attempts_so_far: attempts,
                    });
                }
            }
        }

        tracing::debug!(worker = self.id, attempts, "grind exhausted");
        GrindOutcome::Exhausted { attempts }
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_short_suffix_matches() {
        // 29^1 expected attempts; a million is far past any realistic tail.
        let target = SuffixTarget::normalize(Some("a"));
        let worker = GrindWorker::new(0).with_max_attempts(1_000_000);
        let outcome = worker.grind(&target, 0, &CancelToken::new(), None);

        let attempts = outcome.attempts();
        let keypair = outcome.into_keypair().expect("expected a match");
        assert!(target.matches(keypair.public_identifier()));
        assert!(attempts >= 1);
    }

    #[test]
    fn test_two_char_suffix_within_bound() {
        let target = SuffixTarget::normalize(Some("ab"));
        let worker = GrindWorker::new(0).with_max_attempts(200_000);
        let outcome = worker.grind(&target, 0, &CancelToken::new(), None);
        let keypair = outcome.into_keypair().expect("expected a match for \"ab\"");
        assert!(keypair.public_identifier().to_lowercase().ends_with("ab"));
    }

    #[test]
    fn test_pre_cancelled_returns_immediately() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = GrindWorker::new(0).grind(
            &SuffixTarget::normalize(Some("zzzzzzzz")),
            0,
            &cancel,
            None,
        );
        assert!(matches!(outcome, GrindOutcome::Cancelled { attempts: 0 }));
    }

    #[test]
    fn test_exhausted_is_distinct_from_cancelled() {
        let outcome = GrindWorker::new(0).with_max_attempts(100).grind(
            &SuffixTarget::normalize(Some("zzzzzzzz")),
            0,
            &CancelToken::new(),
            None,
        );
        assert!(matches!(outcome, GrindOutcome::Exhausted { attempts: 100 }));
    }

    #[test]
    fn test_progress_reported_at_interval() {
        let (tx, rx) = unbounded();
        let outcome = GrindWorker::new(0).with_max_attempts(50).grind(
            &SuffixTarget::normalize(Some("zzzzzzzz")),
            10,
            &CancelToken::new(),
            Some(&tx),
        );
        assert!(matches!(outcome, GrindOutcome::Exhausted { .. }));

        let reported: Vec<u64> = rx
            .try_iter()
            .map(|event| match event {
                GrindEvent::Progress { attempts_so_far } => attempts_so_far,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(reported, vec![10, 20, 30, 40, 50]);
    }
}
