//! Ballroom runtime: spawns both populations and supervises the run.

use crate::activity::{DanceActivity, RandomDelays};
use crate::floor::{DanceFloor, FloorSnapshot};
use crate::observer::{FloorObserver, TracingObserver};
use crate::protocol::{DancerOutcome, DancerProtocol, DancerReport};
use ballroom_core::{BallroomConfig, BallroomError, DancerId, Result, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallroomReport {
    /// One entry per dancer, leaders first, in index order
    pub dancers: Vec<DancerReport>,
    /// Floor state after every dancer stopped
    pub floor: FloorSnapshot,
    /// Set when the timed close could not get the floor
    pub close_failure: Option<BallroomError>,
}

impl BallroomReport {
    /// Errors from dancers and from closing
    pub fn failures(&self) -> Vec<&BallroomError> {
        self.dancers
            .iter()
            .filter_map(DancerReport::error)
            .chain(self.close_failure.as_ref())
            .collect()
    }

    /// No dancer failed and the floor closed cleanly
    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }

    /// Report for one dancer
    pub fn dancer(&self, id: DancerId) -> Option<&DancerReport> {
        self.dancers.iter().find(|report| report.dancer == id)
    }

    /// Dances completed by the given role, summed over its dancers
    pub fn dances_of(&self, role: Role) -> u64 {
        self.dancers
            .iter()
            .filter(|report| report.dancer.role == role)
            .map(|report| report.cycles)
            .sum()
    }

    /// Dancers of each outcome kind: completed, dismissed, failed
    pub fn outcome_counts(&self) -> (usize, usize, usize) {
        self.dancers
            .iter()
            .fold((0, 0, 0), |(done, dismissed, failed), report| match report.outcome {
                DancerOutcome::Completed => (done + 1, dismissed, failed),
                DancerOutcome::Dismissed => (done, dismissed + 1, failed),
                DancerOutcome::Failed(_) => (done, dismissed, failed + 1),
            })
    }
}

/// A floor plus the leader and follower populations that share it.
pub struct Ballroom {
    config: BallroomConfig,
    floor: Arc<DanceFloor>,
    activity: Arc<dyn DanceActivity>,
    observer: Arc<dyn FloorObserver>,
}

impl std::fmt::Debug for Ballroom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ballroom")
            .field("config", &self.config)
            .field("floor", &self.floor.snapshot())
            .finish_non_exhaustive()
    }
}

impl Ballroom {
    /// Validate `config` and set up random delays with tracing output.
    pub fn new(config: BallroomConfig) -> Result<Self> {
        config.validate()?;
        let delays = RandomDelays::from_config(&config);
        info!(seed = delays.seed(), "delay generator seeded");
        Ok(Self {
            config,
            floor: Arc::new(DanceFloor::new()),
            activity: Arc::new(delays),
            observer: Arc::new(TracingObserver::new()),
        })
    }

    /// Replace the delay source
    pub fn with_activity(mut self, activity: Arc<dyn DanceActivity>) -> Self {
        self.activity = activity;
        self
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: Arc<dyn FloorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The shared floor, for sampling or closing from outside the run
    pub fn floor(&self) -> Arc<DanceFloor> {
        self.floor.clone()
    }

    /// Configuration in effect
    pub fn config(&self) -> &BallroomConfig {
        &self.config
    }

    /// Every dancer that [`Ballroom::run`] will spawn, leaders first
    pub fn dancers(&self) -> Vec<DancerId> {
        let leaders = (0..self.config.leaders).map(|i| DancerId::new(Role::Leader, i));
        let followers = (0..self.config.followers).map(|i| DancerId::new(Role::Follower, i));
        leaders.chain(followers).collect()
    }

    /// Spawn every dancer and wait for all of them to stop.
    ///
    /// Dancers stop at their cycle limit, when the floor closes (after
    /// `run_for`, or by an outside [`DanceFloor::close`]), or on a fatal
    /// error. Failures are reported per dancer, not returned as `Err`.
    pub async fn run(self) -> Result<BallroomReport> {
        let timeout = self.config.liveness_timeout();
        for role in Role::ALL {
            let population = match role {
                Role::Leader => self.config.leaders,
                Role::Follower => self.config.followers,
            };
            if population == 0 {
                warn!(
                    missing = %role,
                    partners = %role.opposite(),
                    "no {role}s in the ballroom; every {} will time out",
                    role.opposite()
                );
            }
        }
        info!(
            leaders = self.config.leaders,
            followers = self.config.followers,
            timeout_ms = timeout.as_millis() as u64,
            "ballroom opening"
        );

        let mut tasks = JoinSet::new();
        for id in self.dancers() {
            let protocol = DancerProtocol::new(
                id,
                self.floor.clone(),
                self.activity.clone(),
                self.observer.clone(),
                timeout,
            );
            let span = info_span!("dancer", dancer = %id, role = %id.role);
            tasks.spawn(protocol.run(self.config.cycles_per_dancer).instrument(span));
        }

        let closer = self.config.run_for().map(|run_for| {
            let floor = self.floor.clone();
            tokio::spawn(async move {
                tokio::time::sleep(run_for).await;
                floor.close(timeout).await
            })
        });

        let mut dancers = Vec::with_capacity(self.config.total_dancers());
        while let Some(joined) = tasks.join_next().await {
            let report =
                joined.map_err(|e| BallroomError::internal(format!("dancer task failed: {e}")))?;
            dancers.push(report);
        }
        dancers.sort_by_key(|report| report.dancer);

        let mut close_failure = None;
        if let Some(closer) = closer {
            if closer.is_finished() {
                match closer.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        error!(%err, "closing the floor failed");
                        close_failure = Some(err);
                    }
                    Err(e) => {
                        return Err(BallroomError::internal(format!("closer task failed: {e}")))
                    }
                }
            } else {
                // Everybody stopped on their own before closing time.
                closer.abort();
            }
        }

        let report = BallroomReport {
            dancers,
            floor: self.floor.snapshot(),
            close_failure,
        };
        let (completed, dismissed, failed) = report.outcome_counts();
        info!(
            dances = report.dances_of(Role::Leader),
            completed, dismissed, failed, "ballroom closed"
        );
        Ok(report)
    }
}
