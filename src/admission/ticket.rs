// ============================================================================
// Ticket
// ============================================================================
//
// A ticket is the admitted form of a mutating request: the rest of its
// processing pipeline, boxed as a `Send + 'static` future so that any
// task holding the admission lock can drive it, plus a one-shot channel
// that carries the result back to the task that admitted it.
//
// ============================================================================

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// The remaining processing pipeline of one request
pub type Continuation<T> = BoxFuture<'static, T>;

/// Receiving half held by the admitting task
pub type Reply<T> = oneshot::Receiver<T>;

/// How a ticket's run ended, from the gate's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Result handed to the owner
    Delivered,
    /// Continuation finished but the owner had already gone away
    OwnerGone,
    /// Continuation panicked; the owner sees a closed reply channel
    Panicked,
}

/// An admitted mutating request
pub struct Ticket<T> {
    sequence: u64,
    admitted_at: Instant,
    continuation: Continuation<T>,
    reply: oneshot::Sender<T>,
}

impl<T: Send + 'static> Ticket<T> {
    /// Snapshot a continuation into a ticket. Nothing runs until the ticket
    /// is dequeued under the admission lock.
    pub fn admit<F>(continuation: F) -> (Self, Reply<T>)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let ticket = Self {
            sequence: 0,
            admitted_at: Instant::now(),
            continuation: continuation.boxed(),
            reply,
        };
        (ticket, receiver)
    }

    /// Run the continuation to completion and deliver its output.
    ///
    /// Consumes the ticket, so a ticket can run at most once. A panic inside
    /// the continuation is contained here and reported as `Panicked`.
    pub async fn run(self) -> RunOutcome {
        let Ticket {
            continuation,
            reply,
            ..
        } = self;

        match AssertUnwindSafe(continuation).catch_unwind().await {
            Ok(output) => match reply.send(output) {
                Ok(()) => RunOutcome::Delivered,
                Err(_) => RunOutcome::OwnerGone,
            },
            // Dropping `reply` closes the owner's channel
            Err(_) => RunOutcome::Panicked,
        }
    }
}

impl<T> Ticket<T> {
    /// Position in FIFO order, assigned by the queue on enqueue
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Time spent since admission
    pub fn waited(&self) -> Duration {
        self.admitted_at.elapsed()
    }
}

impl<T> std::fmt::Debug for Ticket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("sequence", &self.sequence)
            .field("waited", &self.admitted_at.elapsed())
            .finish_non_exhaustive()
    }
}
