//! Waiting-dancer counts.
//!
//! Only counts are kept, not identities, so a newcomer cannot choose a
//! particular partner; whichever waiter the handshake wakes is the match.

use ballroom_core::{BallroomError, PerRole, Result, Role};
use serde::{Deserialize, Serialize};

/// Outcome of one arrival against the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// A waiting partner was taken off the opposite count
    Matched,
    /// No partner was waiting; the arrival joined its own count
    Enqueued,
}

/// Number of leaders and followers currently waiting for a partner.
///
/// At most one of the two is ever non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounter {
    waiting: PerRole<usize>,
}

impl RoleCounter {
    /// Empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Dancers of `role` waiting
    pub fn waiting(&self, role: Role) -> usize {
        *self.waiting.get(role)
    }

    /// Either take a waiting partner or join the own-role count.
    pub fn arrive(&mut self, role: Role) -> Result<Arrival> {
        if self.waiting(role.opposite()) > 0 {
            self.take(role.opposite())?;
            Ok(Arrival::Matched)
        } else {
            self.enqueue(role)?;
            Ok(Arrival::Enqueued)
        }
    }

    /// Add one waiter of `role`.
    ///
    /// Rejected without touching the counts while the other role waits.
    pub fn enqueue(&mut self, role: Role) -> Result<()> {
        let partners = self.waiting(role.opposite());
        if partners > 0 {
            return Err(BallroomError::invariant(format!(
                "{role} enqueued while {partners} {} waiting",
                role.opposite()
            )));
        }
        *self.waiting.get_mut(role) += 1;
        Ok(())
    }

    /// Remove one waiter of `role`.
    pub fn take(&mut self, role: Role) -> Result<()> {
        self.check()?;
        let slot = self.waiting.get_mut(role);
        *slot = slot.checked_sub(1).ok_or_else(|| {
            BallroomError::invariant(format!("no waiting {role} to take"))
        })?;
        Ok(())
    }

    /// Forget every waiter, returning the counts that were dropped.
    pub fn clear(&mut self) -> PerRole<usize> {
        std::mem::take(&mut self.waiting)
    }

    /// Both pools must never be populated at once.
    pub fn check(&self) -> Result<()> {
        if self.waiting.leader > 0 && self.waiting.follower > 0 {
            return Err(BallroomError::invariant(format!(
                "{} leaders and {} followers waiting at the same time",
                self.waiting.leader, self.waiting.follower
            )));
        }
        Ok(())
    }

    /// Both counts
    pub fn counts(&self) -> PerRole<usize> {
        self.waiting
    }
}
