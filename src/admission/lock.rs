use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Held while exactly one continuation runs
pub type AdmissionPermit<'a> = MutexGuard<'a, ()>;

/// Process-wide binary lock around continuation execution.
///
/// Not re-entrant. Waiters are woken in the order they started waiting.
#[derive(Default)]
pub struct AdmissionLock {
    inner: Mutex<()>,
}

impl AdmissionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> AdmissionPermit<'_> {
        self.inner.lock().await
    }

    /// Bounded acquisition. `None` when `limit` elapsed first.
    pub async fn acquire_within(&self, limit: Duration) -> Option<AdmissionPermit<'_>> {
        tokio::time::timeout(limit, self.inner.lock()).await.ok()
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
