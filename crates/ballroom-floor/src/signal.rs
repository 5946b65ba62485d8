//! Single-slot signal built on a zero-permit semaphore.
//!
//! `signal` hands out one permit, `wait` consumes one. Waiting never spins
//! and is always bounded; the bound is a liveness detector, not a retry.

use std::time::Duration;
use tokio::sync::Semaphore;

/// Why a bounded wait returned without a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// The bound expired first
    #[error("wait timed out")]
    Timeout,
    /// The signal was closed while waiting
    #[error("signal closed")]
    Closed,
}

/// Counting signal that starts empty.
#[derive(Debug)]
pub struct Signal {
    permits: Semaphore,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// Create an empty signal
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(0),
        }
    }

    /// Release one slot, waking at most one waiter.
    pub fn signal(&self) {
        self.permits.add_permits(1);
    }

    /// Block until a slot is available, the signal closes, or `timeout` passes.
    pub async fn wait(&self, timeout: Duration) -> Result<(), WaitError> {
        match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Err(_elapsed) => Err(WaitError::Timeout),
            Ok(Err(_closed)) => Err(WaitError::Closed),
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(())
            }
        }
    }

    /// Signals sent but not yet consumed.
    pub fn pending(&self) -> usize {
        self.permits.available_permits()
    }

    /// Fail current and future waiters with [`WaitError::Closed`].
    ///
    /// A waiter that was already handed a slot keeps it.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Whether [`Signal::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
