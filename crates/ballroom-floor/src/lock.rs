//! The floor lock.
//!
//! A binary gate whose proof of ownership, [`FloorGrant`], can change hands:
//! the dancer who acquires the floor for a match is not always the one who
//! releases it. The grant is neither `Clone` nor `Copy` and is consumed by
//! [`FloorLock::release`], so one acquisition is released at most once.

use crate::signal::WaitError;
use ballroom_core::{BallroomError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Proof that the holder currently owns the floor.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the floor stays locked until the grant is released"]
pub struct FloorGrant {
    ticket: u64,
}

impl FloorGrant {
    /// Acquisition sequence number
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// Single-occupancy floor gate.
#[derive(Debug)]
pub struct FloorLock {
    gate: Semaphore,
    holder: Mutex<Option<u64>>,
    next_ticket: AtomicU64,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl Default for FloorLock {
    fn default() -> Self {
        Self::new()
    }
}

impl FloorLock {
    /// Create an unlocked floor
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(1),
            holder: Mutex::new(None),
            next_ticket: AtomicU64::new(0),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Wait for the floor, at most `timeout`.
    pub async fn acquire(&self, timeout: Duration) -> std::result::Result<FloorGrant, WaitError> {
        let permit = match tokio::time::timeout(timeout, self.gate.acquire()).await {
            Err(_elapsed) => return Err(WaitError::Timeout),
            Ok(Err(_closed)) => return Err(WaitError::Closed),
            Ok(Ok(permit)) => permit,
        };
        // Ownership now travels with the grant, not the permit.
        permit.forget();

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        *self.holder.lock() = Some(ticket);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(FloorGrant { ticket })
    }

    /// Check that `grant` is the current holder.
    pub fn verify(&self, grant: &FloorGrant) -> Result<()> {
        let holder = *self.holder.lock();
        if holder == Some(grant.ticket) {
            Ok(())
        } else {
            Err(stale_grant(grant, holder))
        }
    }

    /// Hand the floor back.
    ///
    /// Fails if `grant` is not the current holder, which can only happen
    /// when the grant was issued by a different lock.
    pub fn release(&self, grant: FloorGrant) -> Result<()> {
        {
            let mut holder = self.holder.lock();
            if *holder != Some(grant.ticket) {
                return Err(stale_grant(&grant, *holder));
            }
            *holder = None;
        }
        if self.gate.available_permits() != 0 {
            return Err(BallroomError::invariant(
                "floor gate already open while a grant was outstanding",
            ));
        }
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.gate.add_permits(1);
        Ok(())
    }

    /// Whether nobody holds the floor
    pub fn is_available(&self) -> bool {
        self.holder.lock().is_none()
    }

    /// Total successful acquisitions
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Total releases
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }
}

fn stale_grant(grant: &FloorGrant, holder: Option<u64>) -> BallroomError {
    match holder {
        Some(current) => BallroomError::invariant(format!(
            "floor grant #{} used while grant #{current} holds the floor",
            grant.ticket
        )),
        None => BallroomError::invariant(format!(
            "floor grant #{} used while nobody holds the floor",
            grant.ticket
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_acquire_release_cycle() {
        let lock = FloorLock::new();
        assert!(lock.is_available());

        let grant = lock.acquire(BOUND).await.unwrap();
        assert!(!lock.is_available());
        lock.verify(&grant).unwrap();
        lock.release(grant).unwrap();

        assert!(lock.is_available());
        assert_eq!(lock.acquisitions(), 1);
        assert_eq!(lock.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_times_out() {
        let lock = FloorLock::new();
        let _held = lock.acquire(BOUND).await.unwrap();
        assert_eq!(lock.acquire(BOUND).await.unwrap_err(), WaitError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_by_non_holder_rejected() {
        let ours = FloorLock::new();
        let theirs = FloorLock::new();
        let grant = theirs.acquire(BOUND).await.unwrap();

        let err = ours.release(grant).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(ours.is_available());
        assert_eq!(ours.releases(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grant_moves_between_tasks() {
        let lock = std::sync::Arc::new(FloorLock::new());
        let grant = lock.acquire(BOUND).await.unwrap();
        let ticket = grant.ticket();

        let releaser = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.release(grant) })
        };
        releaser.await.unwrap().unwrap();

        let next = lock.acquire(BOUND).await.unwrap();
        assert_eq!(next.ticket(), ticket + 1);
        lock.release(next).unwrap();
    }
}
