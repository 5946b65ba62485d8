//! Protocol properties under randomized populations and delays
//!
//! Each case runs a full ballroom on a paused current-thread runtime and
//! checks:
//! - at most one pair dances at a time, one dancer per role
//! - the two waiting counts are never both positive
//! - the floor is released exactly once per completed dance
//! - every dancer completes at least one cycle
//! - partners leave the floor at the same instant
//!
//! A second test repeats the core checks on a multi-threaded runtime with
//! real time, where the gaps between releasing the floor and waiting on a
//! handshake are open to other workers.

use ballroom_core::{BallroomConfig, Role};
use ballroom_floor::{Ballroom, BallroomReport, FloorMonitor, RandomDelays};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct Run {
    report: BallroomReport,
    monitor: Arc<FloorMonitor>,
    samples: usize,
    both_waiting: usize,
}

fn run_ballroom(leaders: usize, followers: usize, seed: u64) -> Run {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let config = BallroomConfig {
            leaders,
            followers,
            max_arrival_delay_ms: 20,
            max_dance_ms: 20,
            liveness_timeout_ms: Some(2_000),
            run_for_ms: Some(1_500),
            seed: Some(seed),
            ..Default::default()
        };
        let monitor = Arc::new(FloorMonitor::new());
        let ballroom = Ballroom::new(config.clone())
            .unwrap()
            .with_activity(Arc::new(RandomDelays::from_config(&config)))
            .with_observer(monitor.clone());

        let floor = ballroom.floor();
        let sampler = tokio::spawn(async move {
            let mut samples = 0;
            let mut both_waiting = 0;
            loop {
                let snapshot = floor.snapshot();
                samples += 1;
                if snapshot.waiting_leaders > 0 && snapshot.waiting_followers > 0 {
                    both_waiting += 1;
                }
                if snapshot.closed {
                    break (samples, both_waiting);
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        let report = ballroom.run().await.unwrap();
        let (samples, both_waiting) = sampler.await.unwrap();
        Run {
            report,
            monitor,
            samples,
            both_waiting,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_floor_holds_one_pair(
        leaders in 1usize..=4,
        followers in 1usize..=4,
        seed in any::<u64>(),
    ) {
        let run = run_ballroom(leaders, followers, seed);
        let stats = run.monitor.stats();

        prop_assert!(run.report.is_clean(), "failures: {:?}", run.report.failures());
        prop_assert!(stats.violations.is_empty(), "violations: {:?}", stats.violations);
        prop_assert!(stats.max_dancing <= 2);
        prop_assert!(stats.max_dancing_per_role.leader <= 1);
        prop_assert!(stats.max_dancing_per_role.follower <= 1);

        prop_assert!(run.samples > 1000);
        prop_assert_eq!(run.both_waiting, 0);

        prop_assert_eq!(stats.releases, stats.completed_dances());
        prop_assert_eq!(stats.dances_of(Role::Leader), stats.dances_of(Role::Follower));
        prop_assert_eq!(run.report.dances_of(Role::Leader), stats.completed_dances());
        prop_assert!(run.report.floor.floor_available);
        prop_assert_eq!(run.report.floor.acquisitions, run.report.floor.releases);

        for dancer in &run.report.dancers {
            prop_assert!(dancer.cycles >= 1, "{} never danced", dancer.dancer);
        }

        for gap in run.monitor.departure_gaps() {
            prop_assert!(gap <= Duration::from_millis(1), "partners left {:?} apart", gap);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_workers_keep_the_floor_exclusive() {
    for seed in 0..12u64 {
        let config = BallroomConfig {
            leaders: 6,
            followers: 4,
            max_arrival_delay_ms: 1,
            max_dance_ms: 1,
            liveness_timeout_ms: Some(5_000),
            run_for_ms: Some(200),
            seed: Some(seed),
            ..Default::default()
        };
        let monitor = Arc::new(FloorMonitor::new());
        let report = Ballroom::new(config)
            .unwrap()
            .with_observer(monitor.clone())
            .run()
            .await
            .unwrap();
        let stats = monitor.stats();

        assert!(report.is_clean(), "seed {seed}: {:?}", report.failures());
        assert!(stats.violations.is_empty(), "seed {seed}: {:?}", stats.violations);
        assert!(stats.completed_dances() > 0, "seed {seed}: nobody danced");
        assert_eq!(stats.releases, stats.completed_dances(), "seed {seed}");
        assert_eq!(
            stats.dances_of(Role::Leader),
            stats.dances_of(Role::Follower),
            "seed {seed}"
        );
        assert_eq!(report.dances_of(Role::Leader), report.dances_of(Role::Follower));
        assert!(report.floor.closed);
        assert!(report.floor.floor_available);
        assert_eq!(report.floor.acquisitions, report.floor.releases, "seed {seed}");
    }
}
