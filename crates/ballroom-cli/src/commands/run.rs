//! `ballroom run`: dance until the cycle limit, the time limit or Ctrl-C.

use super::{load_config, Overrides};
use anyhow::{bail, Context, Result};
use ballroom_core::Role;
use ballroom_floor::{
    Ballroom, BallroomReport, DancerOutcome, DancerReport, FloorMonitor, FloorStats, Observers,
    TracingObserver,
};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the simulation
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Print the final report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Handle run command execution
pub async fn handle_run(cmd: RunCommand, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, &cmd.overrides)?;
    let timeout = config.liveness_timeout();
    let monitor = Arc::new(FloorMonitor::new());
    let ballroom = Ballroom::new(config)?.with_observer(Arc::new(
        Observers::new()
            .with(Arc::new(TracingObserver::new()))
            .with(monitor.clone()),
    ));
    let floor = ballroom.floor();

    let run = ballroom.run();
    tokio::pin!(run);
    let report = tokio::select! {
        report = &mut run => report?,
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, closing the dance floor");
            let closing = floor.close(timeout).await;
            let mut report = run.await?;
            if let Err(err) = closing {
                warn!(%err, "Dance floor did not close cleanly");
                if report.close_failure.is_none() {
                    report.close_failure = Some(err);
                }
            }
            report
        }
    };

    let stats = monitor.stats();
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &stats);
    }

    let failures = report.failures().len();
    if failures > 0 {
        bail!("{failures} failure(s) during the run");
    }
    if !stats.violations.is_empty() {
        bail!("{} floor property violation(s)", stats.violations.len());
    }
    Ok(())
}

fn print_summary(report: &BallroomReport, stats: &FloorStats) {
    println!("{:<6} {:<9} {:>7}  outcome", "dancer", "role", "dances");
    for dancer in &report.dancers {
        println!("{}", summary_row(dancer));
    }
    println!();
    println!(
        "pairs danced: {}  floor releases: {}  queued: {} leaders, {} followers",
        report.dances_of(Role::Leader),
        stats.releases,
        stats.queue_entries.leader,
        stats.queue_entries.follower
    );
    println!(
        "still waiting: {} leaders, {} followers  floor {}",
        report.floor.waiting_leaders,
        report.floor.waiting_followers,
        if report.floor.closed { "closed" } else { "open" }
    );
    if let Some(err) = &report.close_failure {
        println!("close failed: {err}");
    }
}

fn summary_row(dancer: &DancerReport) -> String {
    let outcome = match &dancer.outcome {
        DancerOutcome::Completed => "completed".to_string(),
        DancerOutcome::Dismissed => "dismissed".to_string(),
        DancerOutcome::Failed(err) => format!("failed: {err}"),
    };
    format!(
        "{:<6} {:<9} {:>7}  {outcome}",
        dancer.dancer, dancer.dancer.role, dancer.cycles
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballroom_core::{BallroomError, DancerId, WaitStage};

    #[test]
    fn test_summary_columns_line_up() {
        let leader = DancerReport {
            dancer: DancerId::new(Role::Leader, 0),
            cycles: 12,
            outcome: DancerOutcome::Completed,
        };
        let follower = DancerReport {
            dancer: DancerId::new(Role::Follower, 27),
            cycles: 3,
            outcome: DancerOutcome::Failed(BallroomError::liveness_timeout(
                "ab",
                WaitStage::Handshake,
                100,
            )),
        };

        assert_eq!(summary_row(&leader), "1      leader         12  completed");
        let row = summary_row(&follower);
        assert!(row.starts_with("ab     follower        3  failed: "), "{row}");
        assert!(row.ends_with("at handshake"), "{row}");
    }
}
