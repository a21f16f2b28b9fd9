use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rulegate_config::AdmissionConfig;
use rulegate_error::AppError;
use thiserror::Error;

use super::classifier::{RequestClass, RequestClassifier};
use super::lock::{AdmissionLock, AdmissionPermit};
use super::queue::AdmissionQueue;
use super::ticket::{Reply, RunOutcome, Ticket};

/// Why a mutating request was turned away or lost
#[derive(Debug, Error)]
pub enum GateError {
    /// The admission lock was not acquired in time and the ticket was withdrawn
    #[error("admission lock not acquired within {waited:?}")]
    Busy { waited: Duration },

    /// The ticket ran but produced no result for its owner (the continuation panicked)
    #[error("mutating request ended without a response")]
    Abandoned,
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Busy { waited } => AppError::GateBusy {
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            },
            GateError::Abandoned => AppError::internal(err.to_string()),
        }
    }
}

/// Point-in-time counters of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateStats {
    pub admitted: u64,
    pub completed: u64,
    pub withdrawn: u64,
    pub panicked: u64,
    pub pending: usize,
}

#[derive(Default)]
struct Counters {
    admitted: AtomicU64,
    completed: AtomicU64,
    withdrawn: AtomicU64,
    panicked: AtomicU64,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum TurnOutcome {
    /// Ran the ticket at the queue head (not necessarily the caller's own)
    Served,
    /// Gave up on the lock and removed the caller's own pending ticket
    Withdrawn { waited: Duration },
}

/// Mutating-operation admission gate.
///
/// Read-only requests pass straight through. Mutating requests are admitted
/// as tickets into one FIFO queue and executed one at a time under a single
/// lock. Every admitted ticket is paired with exactly one turn; a turn
/// acquires the lock, runs whatever ticket is at the head of the queue and
/// releases the lock. Results travel back to each ticket's owner over its
/// reply channel, so every caller receives the output of its own request.
pub struct AdmissionGate<T> {
    classifier: RequestClassifier,
    queue: AdmissionQueue<T>,
    lock: AdmissionLock,
    acquire_timeout: Option<Duration>,
    counters: Counters,
}

impl<T: Send + 'static> AdmissionGate<T> {
    pub fn new(classifier: RequestClassifier, acquire_timeout: Option<Duration>) -> Self {
        Self {
            classifier,
            queue: AdmissionQueue::new(),
            lock: AdmissionLock::new(),
            acquire_timeout,
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(
            RequestClassifier::from_config(config),
            config.acquire_timeout,
        )
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    /// Run `continuation` for the request at `path`, serialized when the
    /// path names a mutating operation.
    pub async fn wrap<F>(self: &Arc<Self>, path: &str, continuation: F) -> Result<T, GateError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        match self.classifier.classify_path(path) {
            RequestClass::ReadOnly => Ok(continuation.await),
            RequestClass::Mutating => self.run_serialized(continuation).await,
        }
    }

    /// Admit `continuation` as a ticket and wait for its result.
    pub async fn run_serialized<F>(self: &Arc<Self>, continuation: F) -> Result<T, GateError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (sequence, reply) = self.admit(continuation);

        // The turn runs detached: dropping this future must not lose it
        let gate = Arc::clone(self);
        let turn = tokio::spawn(async move { gate.take_turn(sequence).await });

        match turn.await {
            Ok(TurnOutcome::Served) => {}
            Ok(TurnOutcome::Withdrawn { waited }) => return Err(GateError::Busy { waited }),
            Err(e) => {
                tracing::error!(sequence = sequence, error = %e, "Admission turn failed");
            }
        }

        reply.await.map_err(|_| GateError::Abandoned)
    }

    /// Enqueue `continuation` without taking a turn for it
    pub(super) fn admit<F>(&self, continuation: F) -> (u64, Reply<T>)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (ticket, reply) = Ticket::admit(continuation);
        let sequence = self.queue.enqueue(ticket);
        self.counters.admitted.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            sequence = sequence,
            queue_depth = self.queue.len(),
            "Mutating request admitted"
        );

        (sequence, reply)
    }

    pub(super) async fn take_turn(&self, sequence: u64) -> TurnOutcome {
        let started = Instant::now();
        let permit = match self.acquire_timeout {
            None => self.lock.acquire().await,
            Some(limit) => match self.lock.acquire_within(limit).await {
                Some(permit) => permit,
                None => match self.queue.withdraw(sequence) {
                    Some(ticket) => {
                        self.counters.withdrawn.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            sequence = sequence,
                            waited_ms = ticket.waited().as_millis() as u64,
                            queue_depth = self.queue.len(),
                            "Admission lock timeout, ticket withdrawn"
                        );
                        return TurnOutcome::Withdrawn {
                            waited: started.elapsed(),
                        };
                    }
                    // Already run by another turn; this turn still owes one dequeue
                    None => self.lock.acquire().await,
                },
            },
        };

        self.serve_head(permit).await;
        TurnOutcome::Served
    }

    async fn serve_head(&self, permit: AdmissionPermit<'_>) {
        let ticket = self.queue.dequeue_head();
        let sequence = ticket.sequence();

        tracing::debug!(
            sequence = sequence,
            waited_ms = ticket.waited().as_millis() as u64,
            "Running admitted ticket"
        );

        match ticket.run().await {
            RunOutcome::Delivered => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            RunOutcome::OwnerGone => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(sequence = sequence, "Ticket owner went away before completion");
            }
            RunOutcome::Panicked => {
                self.counters.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(sequence = sequence, "Admitted continuation panicked");
            }
        }

        drop(permit);
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            admitted: self.counters.admitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            withdrawn: self.counters.withdrawn.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            pending: self.queue.len(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock.is_held()
    }
}
