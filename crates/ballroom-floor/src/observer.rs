//! Observation hooks.
//!
//! Observers are write-only: the protocol reports progress to them and
//! never reads anything back.

use ballroom_core::{BallroomError, DancerId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Receives protocol progress events. Every method defaults to a no-op.
pub trait FloorObserver: Send + Sync {
    /// Found no partner and joined its role's queue
    fn entered_queue(&self, _dancer: &DancerId) {}

    /// Started dancing
    fn stepped_on(&self, _dancer: &DancerId) {}

    /// Finished dancing, about to meet the partner at the rendezvous
    fn stepped_off(&self, _dancer: &DancerId) {}

    /// Passed the rendezvous; the pair has finished together
    fn left_floor(&self, _dancer: &DancerId) {}

    /// Handed the floor to the next pair
    fn floor_released(&self, _dancer: &DancerId) {}

    /// Sent home because the floor closed
    fn dismissed(&self, _dancer: &DancerId) {}

    /// Stopped by a fatal protocol error
    fn failed(&self, _dancer: &DancerId, _error: &BallroomError) {}
}

/// Progress lines through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    on_floor: AtomicUsize,
}

impl TracingObserver {
    /// Create an observer
    pub fn new() -> Self {
        Self::default()
    }
}

impl FloorObserver for TracingObserver {
    fn entered_queue(&self, dancer: &DancerId) {
        info!(dancer = %dancer, role = %dancer.role, "{dancer} entering queue");
    }

    fn stepped_on(&self, dancer: &DancerId) {
        let total = self.on_floor.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            dancer = %dancer,
            on_floor = total,
            "{dancer} steps onto the dance floor (people in total: {total})"
        );
    }

    fn stepped_off(&self, dancer: &DancerId) {
        let total = self.on_floor.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        info!(
            dancer = %dancer,
            on_floor = total,
            "{dancer} steps off the dance floor (people in total: {total})"
        );
    }

    fn left_floor(&self, dancer: &DancerId) {
        debug!(dancer = %dancer, "left the floor with partner");
    }

    fn floor_released(&self, dancer: &DancerId) {
        debug!(dancer = %dancer, "floor handed to the next pair");
    }

    fn dismissed(&self, dancer: &DancerId) {
        info!(dancer = %dancer, "{dancer} goes home, the floor is closed");
    }

    fn failed(&self, dancer: &DancerId, error: &BallroomError) {
        error!(dancer = %dancer, %error, "dancer stopped");
    }
}

/// Fan-out to several observers in order.
#[derive(Clone, Default)]
pub struct Observers {
    inner: Vec<Arc<dyn FloorObserver>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.inner.len())
            .finish()
    }
}

impl Observers {
    /// Empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    pub fn with(mut self, observer: Arc<dyn FloorObserver>) -> Self {
        self.inner.push(observer);
        self
    }

    fn each(&self, f: impl Fn(&dyn FloorObserver)) {
        for observer in &self.inner {
            f(observer.as_ref());
        }
    }
}

impl FloorObserver for Observers {
    fn entered_queue(&self, dancer: &DancerId) {
        self.each(|o| o.entered_queue(dancer));
    }

    fn stepped_on(&self, dancer: &DancerId) {
        self.each(|o| o.stepped_on(dancer));
    }

    fn stepped_off(&self, dancer: &DancerId) {
        self.each(|o| o.stepped_off(dancer));
    }

    fn left_floor(&self, dancer: &DancerId) {
        self.each(|o| o.left_floor(dancer));
    }

    fn floor_released(&self, dancer: &DancerId) {
        self.each(|o| o.floor_released(dancer));
    }

    fn dismissed(&self, dancer: &DancerId) {
        self.each(|o| o.dismissed(dancer));
    }

    fn failed(&self, dancer: &DancerId, error: &BallroomError) {
        self.each(|o| o.failed(dancer, error));
    }
}
