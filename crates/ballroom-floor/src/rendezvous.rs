//! Two-party barrier run after every dance.

use crate::signal::{Signal, WaitError};
use ballroom_core::{PerRole, Role};
use std::time::Duration;

/// Both members of a match signal their own role and wait on the other's,
/// so neither leaves before the partner has finished dancing.
///
/// The signals are not capped at one. The releaser hands the floor on as
/// soon as its own wait returns, so a departing follower can still be
/// collecting its signal when the next pair arrives here; the signals are
/// interchangeable and every one is consumed exactly once.
#[derive(Debug, Default)]
pub struct PostDanceRendezvous {
    arrived: PerRole<Signal>,
}

impl PostDanceRendezvous {
    /// Create an empty rendezvous
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce that `role` finished dancing and wait for the partner.
    pub async fn arrive(&self, role: Role, timeout: Duration) -> Result<(), WaitError> {
        self.arrived.get(role).signal();
        self.arrived.get(role.opposite()).wait(timeout).await
    }

    /// Unconsumed arrivals per role
    pub fn pending(&self) -> PerRole<usize> {
        PerRole::from_fn(|role| self.arrived.get(role).pending())
    }
}
