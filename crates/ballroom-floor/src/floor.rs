//! The dance floor coordinator.
//!
//! Owns the floor lock, the waiting counts, both handshake channels and the
//! post-dance rendezvous. The counts live behind the lock: every method that
//! reads-and-decides or mutates them demands a [`FloorGrant`].

use crate::counter::{Arrival, RoleCounter};
use crate::handshake::HandshakeChannel;
use crate::lock::{FloorGrant, FloorLock};
use crate::rendezvous::PostDanceRendezvous;
use crate::signal::WaitError;
use ballroom_core::{BallroomError, Result, Role, WaitStage};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened when a dancer held the floor and looked for a partner.
#[derive(Debug)]
pub enum Decision {
    /// A partner was waiting and has been signalled. The floor stays
    /// locked for the dance; the releaser keeps the grant, the other role
    /// gets `None` because its grant was parked for the releaser.
    Matched {
        /// Grant to release after the rendezvous, held by the releaser only
        grant: Option<FloorGrant>,
    },
    /// Nobody was waiting; the dancer joined its queue and the floor was
    /// released.
    Enqueued,
    /// The floor is closed; it was released and the dancer should leave.
    Closed,
}

/// Point-in-time view of the floor for observers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorSnapshot {
    /// Leaders waiting for a follower; zero once the floor is closed
    pub waiting_leaders: usize,
    /// Followers waiting for a leader; zero once the floor is closed
    pub waiting_followers: usize,
    /// Whether nobody holds the floor lock
    pub floor_available: bool,
    /// Whether the floor has been closed
    pub closed: bool,
    /// Floor acquisitions so far
    pub acquisitions: u64,
    /// Floor releases so far
    pub releases: u64,
}

#[derive(Debug, Default)]
struct FloorState {
    counter: RoleCounter,
    closed: bool,
}

/// Shared coordinator for one dance floor.
#[derive(Debug, Default)]
pub struct DanceFloor {
    lock: FloorLock,
    state: Mutex<FloorState>,
    handshake: HandshakeChannel,
    rendezvous: PostDanceRendezvous,
    /// Grant parked by a non-releaser that made a match.
    baton: Mutex<Option<FloorGrant>>,
}

impl DanceFloor {
    /// Create an open, empty floor
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, timeout: Duration) -> std::result::Result<FloorGrant, WaitError> {
        self.lock.acquire(timeout).await
    }

    /// Match or enqueue `role`, holding `grant`.
    ///
    /// Exactly one of the [`Decision`] outcomes happens, with the counter
    /// update and any signal performed before the grant leaves this call.
    /// On error the floor is released, never left locked.
    pub(crate) fn decide(&self, grant: FloorGrant, role: Role) -> Result<Decision> {
        self.lock.verify(&grant)?;

        let arrival = {
            let mut state = self.state.lock();
            if state.closed {
                None
            } else {
                Some(state.counter.arrive(role))
            }
        };

        match arrival {
            None => {
                self.lock.release(grant)?;
                Ok(Decision::Closed)
            }
            Some(Err(err)) => {
                self.abandon(grant, &err);
                Err(err)
            }
            Some(Ok(Arrival::Enqueued)) => {
                self.lock.release(grant)?;
                Ok(Decision::Enqueued)
            }
            Some(Ok(Arrival::Matched)) => {
                if let Err(err) = self.handshake.signal(role.opposite()) {
                    self.abandon(grant, &err);
                    return Err(err);
                }
                if role.is_releaser() {
                    Ok(Decision::Matched { grant: Some(grant) })
                } else {
                    self.park(grant)?;
                    Ok(Decision::Matched { grant: None })
                }
            }
        }
    }

    fn park(&self, grant: FloorGrant) -> Result<()> {
        let mut baton = self.baton.lock();
        if let Some(parked) = baton.as_ref().map(FloorGrant::ticket) {
            let err = BallroomError::invariant(format!(
                "floor grant #{} parked while #{parked} is still waiting for its releaser",
                grant.ticket()
            ));
            drop(baton);
            self.abandon(grant, &err);
            return Err(err);
        }
        *baton = Some(grant);
        Ok(())
    }

    /// Release a grant whose holder is failing with `cause`.
    fn abandon(&self, grant: FloorGrant, cause: &BallroomError) {
        let ticket = grant.ticket();
        match self.lock.release(grant) {
            Ok(()) => warn!(ticket, %cause, "floor released after protocol failure"),
            Err(err) => error!(ticket, %cause, %err, "floor could not be released after failure"),
        }
    }

    /// Hand the floor back at the end of a dance.
    ///
    /// Only the releaser role may call this. It uses the grant it kept, or
    /// picks up the one its partner parked.
    pub(crate) fn release_after_dance(&self, role: Role, kept: Option<FloorGrant>) -> Result<()> {
        if !role.is_releaser() {
            return Err(BallroomError::invariant(format!(
                "{role} attempted to release the floor"
            )));
        }
        let grant = match kept {
            Some(grant) => grant,
            None => self.baton.lock().take().ok_or_else(|| {
                BallroomError::invariant("releaser holds no floor grant after the dance")
            })?,
        };
        debug!(ticket = grant.ticket(), "floor released after dance");
        self.lock.release(grant)
    }

    /// Free the floor for a releaser that failed after matching.
    ///
    /// Releases `kept`, or the grant its partner parked. A non-releaser's
    /// grant is left alone: its partner may still arrive and release it.
    pub(crate) fn release_after_failure(
        &self,
        role: Role,
        kept: Option<FloorGrant>,
        cause: &BallroomError,
    ) {
        if !role.is_releaser() {
            if let Some(grant) = kept {
                self.abandon(grant, cause);
            }
            return;
        }
        let grant = kept.or_else(|| self.baton.lock().take());
        if let Some(grant) = grant {
            self.abandon(grant, cause);
        }
    }

    pub(crate) fn handshake(&self) -> &HandshakeChannel {
        &self.handshake
    }

    pub(crate) fn rendezvous(&self) -> &PostDanceRendezvous {
        &self.rendezvous
    }

    /// Close the floor.
    ///
    /// Waits for the floor like any dancer, so a pair already dancing
    /// finishes first. Queued dancers are dismissed and no longer counted as
    /// waiting; later arrivals find the floor closed and leave. Idempotent.
    pub async fn close(&self, timeout: Duration) -> Result<()> {
        let grant = self.acquire(timeout).await.map_err(|err| match err {
            WaitError::Timeout => BallroomError::liveness_timeout(
                "closer",
                WaitStage::Close,
                timeout.as_millis() as u64,
            ),
            WaitError::Closed => BallroomError::invariant("floor gate closed"),
        })?;

        let dismissed = {
            let mut state = self.state.lock();
            state.closed = true;
            state.counter.clear()
        };
        self.handshake.close();
        info!(
            dismissed_leaders = dismissed.leader,
            dismissed_followers = dismissed.follower,
            "dance floor closed"
        );
        self.lock.release(grant)
    }

    /// Current counts and lock state
    pub fn snapshot(&self) -> FloorSnapshot {
        let (counts, closed) = {
            let state = self.state.lock();
            (state.counter.counts(), state.closed)
        };
        FloorSnapshot {
            waiting_leaders: counts.leader,
            waiting_followers: counts.follower,
            floor_available: self.lock.is_available(),
            closed,
            acquisitions: self.lock.acquisitions(),
            releases: self.lock.releases(),
        }
    }
}
