//! Fan-out of a grind across several worker threads.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::crypto::Keypair;
use crate::matcher::SuffixTarget;

use super::cpu::{GrindWorker, DEFAULT_MAX_ATTEMPTS};
use super::{CancelToken, GrindEvent};

/// Reasons a coordinated grind ends without a keypair.
#[derive(Debug, thiserror::Error)]
pub enum GrindError {
    #[error("no match before the search deadline")]
    SearchTimeout,

    #[error("every worker reached its attempt bound without a match")]
    SearchExhausted,

    #[error("search cancelled")]
    Cancelled,

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker threads exited without reporting")]
    WorkerLost,
}

/// Starts parallel searches and races the workers to the first match.
#[derive(Debug, Clone)]
pub struct GrindCoordinator {
    workers: usize,
    timeout: Option<Duration>,
    report_interval: u64,
    max_attempts: u64,
}

impl GrindCoordinator {
    /// Creates a coordinator that runs `workers` threads per search.
    pub fn new(workers: usize) -> Result<Self, GrindError> {
        if workers == 0 {
            return Err(GrindError::InvalidWorkerCount);
        }
        Ok(Self {
            workers,
            timeout: None,
            report_interval: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Sets the overall wall-clock deadline for a search.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-worker progress interval in attempts (0 disables progress).
    pub fn with_report_interval(mut self, report_interval: u64) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Sets the per-worker attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the number of workers per search.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Searches synchronously and returns the first matching keypair.
    ///
    /// All workers have stopped by the time this returns. No progress is
    /// reported, since nothing reads the event stream.
    pub fn find_vanity_keypair(&self, target: &SuffixTarget) -> Result<Keypair, GrindError> {
        self.without_progress().spawn(target.clone())?.wait()
    }

    fn without_progress(&self) -> Self {
        Self {
            report_interval: 0,
            ..self.clone()
        }
    }

    /// Starts a search in the background.
    ///
    /// The returned handle streams aggregated progress followed by one
    /// terminal event, and can cancel or wait for the search.
    pub fn spawn(&self, target: SuffixTarget) -> Result<GrindHandle, GrindError> {
        let started = Instant::now();
        let cancel = CancelToken::new();
        let (report_tx, report_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();

        info!(
            suffix = %target,
            workers = self.workers,
            expected_attempts = target.estimated_attempts(),
            "starting vanity grind"
        );

        let workers = self.spawn_workers(&target, &cancel, report_tx)?;

        let supervisor = Supervisor {
            reports: report_rx,
            workers,
            cancel: cancel.clone(),
            deadline: self.timeout.map(|t| started + t),
            report_interval: self.report_interval,
            events: events_tx,
        };

        let handle = thread::Builder::new()
            .name("vanity-coordinator".into())
            .spawn(move || supervisor.run());

        match handle {
            Ok(handle) => Ok(GrindHandle {
                cancel,
                events: events_rx,
                supervisor: Some(handle),
                started,
            }),
            Err(e) => {
                // The supervisor (and the worker handles it owned) was dropped
                // with the closure; workers still see the cancel flag and exit.
                cancel.cancel();
                Err(GrindError::Spawn(e))
            }
        }
    }

    /// Spawns worker threads, cancelling the ones already started if one fails.
    fn spawn_workers(
        &self,
        target: &SuffixTarget,
        cancel: &CancelToken,
        report_tx: Sender<GrindEvent>,
    ) -> Result<Vec<JoinHandle<()>>, GrindError> {
        let mut handles = Vec::with_capacity(self.workers);

        for id in 0..self.workers {
            let worker = GrindWorker::new(id).with_max_attempts(self.max_attempts);
            let target = target.clone();
            let cancel_for_worker = cancel.clone();
            let report_tx = report_tx.clone();
            let report_interval = self.report_interval;

            let spawned = thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || {
                    let outcome =
                        worker.grind(&target, report_interval, &cancel_for_worker, Some(&report_tx));
                    let _ = report_tx.send(outcome.into());
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    cancel.cancel();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(GrindError::Spawn(e));
                }
            }
        }

        Ok(handles)
    }
}

/// Owns the worker threads for one search and decides its outcome.
struct Supervisor {
    reports: Receiver<GrindEvent>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelToken,
    deadline: Option<Instant>,
    report_interval: u64,
    events: Sender<GrindEvent>,
}

impl Supervisor {
    fn run(self) -> Result<Keypair, GrindError> {
        let worker_count = self.workers.len();
        // Every worker reports at multiples of the same interval, so each
        // progress event stands for exactly `report_interval` attempts.
        let mut progressed = 0u64;
        let mut finished_attempts = 0u64;
        let mut finished = 0usize;
        let mut cancelled = 0usize;

        let mut result = loop {
            let report = match self.deadline {
                Some(deadline) => match self.reports.recv_deadline(deadline) {
                    Ok(report) => report,
                    Err(RecvTimeoutError::Timeout) => break Err(GrindError::SearchTimeout),
                    Err(RecvTimeoutError::Disconnected) => break Err(GrindError::WorkerLost),
                },
                None => match self.reports.recv() {
                    Ok(report) => report,
                    Err(_) => break Err(GrindError::WorkerLost),
                },
            };

            match report {
                GrindEvent::Progress { .. } => {
                    progressed += self.report_interval;
                    let _ = self.events.send(GrindEvent::Progress {
                        attempts_so_far: progressed,
                    });
                }
                GrindEvent::Result { keypair, attempts } => {
                    finished_attempts += attempts;
                    debug!(attempts, "worker found a match");
                    break Ok(keypair);
                }
                GrindEvent::Cancelled { attempts } => {
                    finished_attempts += attempts;
                    finished += 1;
                    cancelled += 1;
                }
                GrindEvent::Exhausted { attempts } => {
                    finished_attempts += attempts;
                    finished += 1;
                }
            }

            if finished == worker_count {
                break Err(if cancelled > 0 {
                    GrindError::Cancelled
                } else {
                    GrindError::SearchExhausted
                });
            }
        };

        self.cancel.cancel();
        for handle in self.workers {
            if handle.join().is_err() {
                warn!("vanity worker panicked");
            }
        }

        // Workers are stopped; fold in the terminal reports still queued.
        let queued = drain_reports(&self.reports, &mut finished_attempts);
        if matches!(result, Err(GrindError::SearchTimeout)) {
            if let Some(keypair) = queued {
                debug!("match arrived as the deadline passed");
                result = Ok(keypair);
            }
        }
        let total = finished_attempts;

        let terminal = match &result {
            Ok(keypair) => {
                info!(
                    identifier = keypair.public_identifier(),
                    attempts = total,
                    "vanity grind matched"
                );
                GrindEvent::Result {
                    keypair: keypair.clone(),
                    attempts: total,
                }
            }
            Err(GrindError::SearchExhausted) => {
                info!(attempts = total, "vanity grind exhausted");
                GrindEvent::Exhausted { attempts: total }
            }
            Err(e) => {
                info!(attempts = total, reason = %e, "vanity grind stopped");
                GrindEvent::Cancelled { attempts: total }
            }
        };
        let _ = self.events.send(terminal);

        result
    }
}

/// Empties `reports`, adding terminal attempt counts to `attempts`, and
/// returns the first queued match.
fn drain_reports(reports: &Receiver<GrindEvent>, attempts: &mut u64) -> Option<Keypair> {
    let mut found = None;
    for event in reports.try_iter() {
        match event {
            GrindEvent::Progress { .. } => {}
            GrindEvent::Result {
                keypair,
                attempts: n,
            } => {
                *attempts += n;
                found.get_or_insert(keypair);
            }
            GrindEvent::Cancelled { attempts: n } | GrindEvent::Exhausted { attempts: n } => {
                *attempts += n;
            }
        }
    }
    found
}

/// A running search.
///
/// Dropping the handle cancels the search and waits for its threads.
pub struct GrindHandle {
    cancel: CancelToken,
    events: Receiver<GrindEvent>,
    supervisor: Option<JoinHandle<Result<Keypair, GrindError>>>,
    started: Instant,
}

impl GrindHandle {
    /// Returns the event stream: progress, then exactly one terminal event.
    pub fn events(&self) -> &Receiver<GrindEvent> {
        &self.events
    }

    /// Signals all workers to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a clone of the cancel token (e.g., for signal handlers).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns true once every worker has stopped and the outcome is decided.
    pub fn is_finished(&self) -> bool {
        self.supervisor
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Returns the elapsed time since the search started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Blocks until the search ends and every worker has stopped.
    pub fn wait(mut self) -> Result<Keypair, GrindError> {
        match self.supervisor.take() {
            Some(handle) => handle.join().unwrap_or(Err(GrindError::WorkerLost)),
            None => Err(GrindError::WorkerLost),
        }
    }
}

impl Drop for GrindHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.supervisor.take() {
            let _ = handle.join();
        }
    }
}
