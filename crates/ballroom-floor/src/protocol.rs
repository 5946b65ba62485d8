//! Per-dancer state machine.
//!
//! ```text
//! Arriving -> Deciding -+-> Matched ---------------+-> Dancing -> Rendezvous -+-> Arriving
//!                       +-> Enqueued -(handshake)--+                          +-> Releasing -> Arriving
//! ```
//!
//! The same code runs for both roles. The role picks which counter and
//! channel are "mine" and whether this dancer releases the floor.

use crate::activity::DanceActivity;
use crate::floor::{DanceFloor, Decision};
use crate::lock::FloorGrant;
use crate::observer::FloorObserver;
use crate::signal::WaitError;
use ballroom_core::{BallroomError, DancerId, Result, WaitStage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Where a dancer is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DancerState {
    /// Preparing, then waiting for the floor lock
    Arriving,
    /// Holding the floor lock and checking for a partner
    Deciding,
    /// Queued, waiting on the own-role handshake
    Enqueued,
    /// Found a waiting partner; the floor stays locked
    Matched,
    /// Dancing with the partner
    Dancing,
    /// Waiting for the partner to finish
    Rendezvous,
    /// Handing the floor to the next pair (releaser only)
    Releasing,
}

impl fmt::Display for DancerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DancerState::Arriving => "arriving",
            DancerState::Deciding => "deciding",
            DancerState::Enqueued => "enqueued",
            DancerState::Matched => "matched",
            DancerState::Dancing => "dancing",
            DancerState::Rendezvous => "rendezvous",
            DancerState::Releasing => "releasing",
        };
        f.pad(name)
    }
}

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Danced and passed the rendezvous
    Danced,
    /// The floor closed before a match
    Dismissed,
}

/// How a dancer's whole run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DancerOutcome {
    /// Reached its cycle limit
    Completed,
    /// Sent home by the floor closing
    Dismissed,
    /// Stopped by a fatal error
    Failed(BallroomError),
}

/// Final account of one dancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DancerReport {
    /// Who
    pub dancer: DancerId,
    /// Dances completed
    pub cycles: u64,
    /// Why it stopped
    pub outcome: DancerOutcome,
}

impl DancerReport {
    /// The error that stopped this dancer, if any
    pub fn error(&self) -> Option<&BallroomError> {
        match &self.outcome {
            DancerOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// One actor running the dance-floor protocol.
pub struct DancerProtocol {
    id: DancerId,
    floor: Arc<DanceFloor>,
    activity: Arc<dyn DanceActivity>,
    observer: Arc<dyn FloorObserver>,
    timeout: Duration,
    state: DancerState,
    cycles: u64,
}

impl fmt::Debug for DancerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DancerProtocol")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl DancerProtocol {
    /// Create a dancer in the `Arriving` state.
    ///
    /// `timeout` bounds every blocking wait.
    pub fn new(
        id: DancerId,
        floor: Arc<DanceFloor>,
        activity: Arc<dyn DanceActivity>,
        observer: Arc<dyn FloorObserver>,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            floor,
            activity,
            observer,
            timeout,
            state: DancerState::Arriving,
            cycles: 0,
        }
    }

    /// This dancer's identity
    pub fn id(&self) -> DancerId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> DancerState {
        self.state
    }

    /// Dances completed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn enter(&mut self, next: DancerState) {
        trace!(dancer = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn stalled(&self, err: WaitError, stage: WaitStage) -> BallroomError {
        match err {
            WaitError::Timeout => BallroomError::liveness_timeout(
                self.id.label(),
                stage,
                self.timeout.as_millis() as u64,
            ),
            WaitError::Closed => {
                BallroomError::invariant(format!("{stage} wait closed under dancer {}", self.id))
            }
        }
    }

    /// Run one arrive-match-dance-depart cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let role = self.id.role;
        self.enter(DancerState::Arriving);
        self.activity.prepare(&self.id).await;

        let grant = self
            .floor
            .acquire(self.timeout)
            .await
            .map_err(|err| self.stalled(err, WaitStage::Floor))?;
        self.enter(DancerState::Deciding);

        let decision = self.floor.decide(grant, role)?;
        let kept: Option<FloorGrant> = match decision {
            Decision::Closed => return Ok(self.dismiss()),
            Decision::Matched { grant } => {
                self.enter(DancerState::Matched);
                grant
            }
            Decision::Enqueued => {
                self.enter(DancerState::Enqueued);
                self.observer.entered_queue(&self.id);
                let woken = self.floor.handshake().wait(role, self.timeout).await;
                match woken {
                    Ok(()) => None,
                    Err(WaitError::Closed) => return Ok(self.dismiss()),
                    Err(err) => return Err(self.stalled(err, WaitStage::Handshake)),
                }
            }
        };

        self.enter(DancerState::Dancing);
        self.observer.stepped_on(&self.id);
        self.activity.dance(&self.id).await;
        self.observer.stepped_off(&self.id);

        self.enter(DancerState::Rendezvous);
        let met = self.floor.rendezvous().arrive(role, self.timeout).await;
        if let Err(err) = met {
            let err = self.stalled(err, WaitStage::Rendezvous);
            self.floor.release_after_failure(role, kept, &err);
            return Err(err);
        }
        self.observer.left_floor(&self.id);

        if role.is_releaser() {
            self.enter(DancerState::Releasing);
            self.floor.release_after_dance(role, kept)?;
            self.observer.floor_released(&self.id);
        } else if let Some(grant) = kept {
            let err = BallroomError::invariant(format!(
                "{role} {} kept floor grant #{} past the rendezvous",
                self.id,
                grant.ticket()
            ));
            self.floor.release_after_failure(role, Some(grant), &err);
            return Err(err);
        }

        self.cycles += 1;
        self.enter(DancerState::Arriving);
        Ok(CycleOutcome::Danced)
    }

    fn dismiss(&mut self) -> CycleOutcome {
        self.enter(DancerState::Arriving);
        self.observer.dismissed(&self.id);
        CycleOutcome::Dismissed
    }

    /// Loop until `cycle_limit` dances, the floor closes, or an error.
    ///
    /// Without a limit the loop only ends by closing or by failure.
    pub async fn run(mut self, cycle_limit: Option<u64>) -> DancerReport {
        let outcome = loop {
            if cycle_limit.is_some_and(|limit| self.cycles >= limit) {
                break DancerOutcome::Completed;
            }
            match self.run_cycle().await {
                Ok(CycleOutcome::Danced) => {
                    debug!(dancer = %self.id, cycles = self.cycles, "cycle complete");
                }
                Ok(CycleOutcome::Dismissed) => break DancerOutcome::Dismissed,
                Err(err) => {
                    error!(dancer = %self.id, state = %self.state, %err, "protocol failure");
                    self.observer.failed(&self.id, &err);
                    break DancerOutcome::Failed(err);
                }
            }
        };

        DancerReport {
            dancer: self.id,
            cycles: self.cycles,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ScriptedDelays;
    use crate::monitor::FloorMonitor;
    use assert_matches::assert_matches;
    use ballroom_core::Role;

    const BOUND: Duration = Duration::from_secs(5);

    fn dancer(
        id: DancerId,
        floor: &Arc<DanceFloor>,
        script: &Arc<ScriptedDelays>,
        monitor: &Arc<FloorMonitor>,
    ) -> DancerProtocol {
        DancerProtocol::new(id, floor.clone(), script.clone(), monitor.clone(), BOUND)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_runs_one_cycle() {
        let floor = Arc::new(DanceFloor::new());
        let monitor = Arc::new(FloorMonitor::new());
        let leader_id = DancerId::new(Role::Leader, 0);
        let follower_id = DancerId::new(Role::Follower, 0);
        let script = Arc::new(
            ScriptedDelays::new(Duration::from_millis(20))
                .with_arrival(follower_id, Duration::from_millis(10)),
        );

        let mut leader = dancer(leader_id, &floor, &script, &monitor);
        let mut follower = dancer(follower_id, &floor, &script, &monitor);
        let (led, followed) = tokio::join!(leader.run_cycle(), follower.run_cycle());

        assert_eq!(led.unwrap(), CycleOutcome::Danced);
        assert_eq!(followed.unwrap(), CycleOutcome::Danced);
        assert_eq!(leader.state(), DancerState::Arriving);
        assert_eq!(leader.cycles(), 1);

        let stats = monitor.stats();
        assert!(stats.violations.is_empty(), "{:?}", stats.violations);
        assert_eq!(stats.queue_entries, ballroom_core::PerRole::new(1, 0));
        assert_eq!(stats.releases, 1);

        let snapshot = floor.snapshot();
        assert!(snapshot.floor_available);
        assert_eq!(snapshot.acquisitions, 2);
        assert_eq!(snapshot.releases, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_dancer_times_out_in_queue() {
        let floor = Arc::new(DanceFloor::new());
        let monitor = Arc::new(FloorMonitor::new());
        let script = Arc::new(ScriptedDelays::new(Duration::ZERO));
        let follower = dancer(DancerId::new(Role::Follower, 0), &floor, &script, &monitor);

        let report = follower.run(None).await;
        assert_eq!(report.cycles, 0);
        assert_matches!(
            report.error(),
            Some(BallroomError::LivenessTimeout {
                stage: WaitStage::Handshake,
                ..
            })
        );
        assert_eq!(monitor.stats().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_releaser_stuck_at_rendezvous_frees_the_floor() {
        let floor = Arc::new(DanceFloor::new());
        let monitor = Arc::new(FloorMonitor::new());
        let script = Arc::new(ScriptedDelays::new(Duration::from_millis(10)));

        // A queued follower that never shows up for the rendezvous.
        let grant = floor.acquire(BOUND).await.unwrap();
        floor.decide(grant, Role::Follower).unwrap();

        let mut leader = dancer(DancerId::new(Role::Leader, 0), &floor, &script, &monitor);
        let err = leader.run_cycle().await.unwrap_err();
        assert_matches!(
            err,
            BallroomError::LivenessTimeout {
                stage: WaitStage::Rendezvous,
                ..
            }
        );

        let snapshot = floor.snapshot();
        assert!(snapshot.floor_available);
        assert_eq!(snapshot.acquisitions, snapshot.releases);
        floor.close(BOUND).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_floor_dismisses() {
        let floor = Arc::new(DanceFloor::new());
        floor.close(BOUND).await.unwrap();
        let monitor = Arc::new(FloorMonitor::new());
        let script = Arc::new(ScriptedDelays::new(Duration::ZERO));

        let report = dancer(DancerId::new(Role::Leader, 0), &floor, &script, &monitor)
            .run(Some(3))
            .await;
        assert_eq!(report.outcome, DancerOutcome::Dismissed);
        assert_eq!(monitor.stats().dismissed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_completes_without_arriving() {
        let floor = Arc::new(DanceFloor::new());
        let monitor = Arc::new(FloorMonitor::new());
        let script = Arc::new(ScriptedDelays::new(Duration::ZERO));

        let report = dancer(DancerId::new(Role::Leader, 0), &floor, &script, &monitor)
            .run(Some(0))
            .await;
        assert_eq!(report.outcome, DancerOutcome::Completed);
        assert_eq!(floor.snapshot().acquisitions, 0);
    }
}
