use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ticket::Ticket;

struct QueueState<T> {
    next_sequence: u64,
    tickets: VecDeque<Ticket<T>>,
}

/// FIFO container of pending tickets.
///
/// Internally synchronized and independent of the admission lock: enqueue
/// never waits on a running continuation.
pub struct AdmissionQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> Default for AdmissionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AdmissionQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_sequence: 1,
                tickets: VecDeque::new(),
            }),
        }
    }

    // A panic never happens while this mutex is held, but recover anyway
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a ticket at the tail and return its sequence number.
    ///
    /// Sequence numbers are assigned under the queue mutex, so they follow
    /// queue order exactly.
    pub fn enqueue(&self, mut ticket: Ticket<T>) -> u64 {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        ticket.set_sequence(sequence);
        state.tickets.push_back(ticket);
        sequence
    }

    /// Remove the oldest ticket.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Every gate turn is preceded by exactly
    /// one enqueue, so an empty queue here means the turn accounting is broken.
    pub fn dequeue_head(&self) -> Ticket<T> {
        match self.lock().tickets.pop_front() {
            Some(ticket) => ticket,
            None => panic!("admission queue underflow: turn taken without a pending ticket"),
        }
    }

    /// Remove a still-pending ticket by sequence number.
    ///
    /// Returns `None` when the ticket has already been dequeued.
    pub fn withdraw(&self, sequence: u64) -> Option<Ticket<T>> {
        let mut state = self.lock();
        let position = state
            .tickets
            .iter()
            .position(|ticket| ticket.sequence() == sequence)?;
        state.tickets.remove(position)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tickets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().tickets.len()
    }
}
