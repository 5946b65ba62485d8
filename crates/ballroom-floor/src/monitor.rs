//! Property-checking observer.
//!
//! Tracks who is dancing at every instant and records a violation whenever
//! the floor holds more than one pair, two dancers of the same role, or is
//! released more often than dances complete.

use crate::observer::FloorObserver;
use ballroom_core::{BallroomError, DancerId, PerRole, Role, RELEASER};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Summary of everything the monitor saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorStats {
    /// Largest number of dancers dancing at once
    pub max_dancing: usize,
    /// Largest number of dancers of each role dancing at once
    pub max_dancing_per_role: PerRole<usize>,
    /// Times a dancer of each role had to queue
    pub queue_entries: PerRole<u64>,
    /// Completed dances per role (rendezvous passed)
    pub dances: PerRole<u64>,
    /// Floor releases after a dance
    pub releases: u64,
    /// Dancers sent home by closing
    pub dismissed: u64,
    /// Dancers stopped by an error
    pub failures: u64,
    /// Completed dances per dancer label
    pub cycles: BTreeMap<String, u64>,
    /// Broken properties, in the order they were seen
    pub violations: Vec<String>,
}

#[derive(Debug, Default)]
struct MonitorState {
    dancing: PerRole<usize>,
    stats: FloorStats,
    departures: PerRole<Vec<Instant>>,
}

impl MonitorState {
    fn violation(&mut self, message: String) {
        tracing::error!(%message, "floor property violated");
        self.stats.violations.push(message);
    }
}

/// Observer that checks mutual exclusion, pairing and release counts.
#[derive(Debug, Default)]
pub struct FloorMonitor {
    state: Mutex<MonitorState>,
}

impl FloorMonitor {
    /// Create an empty monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the statistics so far
    pub fn stats(&self) -> FloorStats {
        self.state.lock().stats.clone()
    }

    /// Time between the i-th leader and the i-th follower passing the
    /// rendezvous, for every pair that both passed.
    pub fn departure_gaps(&self) -> Vec<Duration> {
        let state = self.state.lock();
        state
            .departures
            .leader
            .iter()
            .zip(&state.departures.follower)
            .map(|(leader, follower)| {
                if leader > follower {
                    leader.duration_since(*follower)
                } else {
                    follower.duration_since(*leader)
                }
            })
            .collect()
    }

    /// Whether every checked property held
    pub fn is_clean(&self) -> bool {
        self.state.lock().stats.violations.is_empty()
    }
}

impl FloorObserver for FloorMonitor {
    fn entered_queue(&self, dancer: &DancerId) {
        *self.state.lock().stats.queue_entries.get_mut(dancer.role) += 1;
    }

    fn stepped_on(&self, dancer: &DancerId) {
        let mut state = self.state.lock();
        *state.dancing.get_mut(dancer.role) += 1;

        let same_role = *state.dancing.get(dancer.role);
        let total = state.dancing.leader + state.dancing.follower;

        let stats = &mut state.stats;
        let peak = stats.max_dancing_per_role.get_mut(dancer.role);
        *peak = (*peak).max(same_role);
        stats.max_dancing = stats.max_dancing.max(total);

        if same_role > 1 {
            state.violation(format!(
                "{dancer} stepped on while another {} was dancing",
                dancer.role
            ));
        }
        if total > 2 {
            state.violation(format!("{dancer} made {total} dancers on a single-pair floor"));
        }
    }

    fn stepped_off(&self, dancer: &DancerId) {
        let mut state = self.state.lock();
        match state.dancing.get(dancer.role).checked_sub(1) {
            Some(remaining) => *state.dancing.get_mut(dancer.role) = remaining,
            None => state.violation(format!("{dancer} stepped off without stepping on")),
        }
    }

    fn left_floor(&self, dancer: &DancerId) {
        let mut state = self.state.lock();
        *state.stats.dances.get_mut(dancer.role) += 1;
        *state.stats.cycles.entry(dancer.label()).or_default() += 1;
        state.departures.get_mut(dancer.role).push(Instant::now());
    }

    fn floor_released(&self, dancer: &DancerId) {
        let mut state = self.state.lock();
        state.stats.releases += 1;
        if dancer.role != RELEASER {
            state.violation(format!("{dancer} released the floor but is not the releaser"));
        }
        let releases = state.stats.releases;
        let dances = *state.stats.dances.get(RELEASER);
        if releases > dances {
            state.violation(format!(
                "{releases} floor releases for {dances} completed dances"
            ));
        }
    }

    fn dismissed(&self, _dancer: &DancerId) {
        self.state.lock().stats.dismissed += 1;
    }

    fn failed(&self, _dancer: &DancerId, _error: &BallroomError) {
        self.state.lock().stats.failures += 1;
    }
}

impl FloorStats {
    /// Pairs that finished, counted from the role that has to show up for
    /// both a dance and its release.
    pub fn completed_dances(&self) -> u64 {
        *self.dances.get(RELEASER)
    }

    /// Completed dances of `role`
    pub fn dances_of(&self, role: Role) -> u64 {
        *self.dances.get(role)
    }
}
