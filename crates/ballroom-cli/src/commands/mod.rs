//! Subcommand handlers and the configuration they share.

pub mod config;
pub mod run;

use anyhow::{Context, Result};
use ballroom_core::BallroomConfig;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File read when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "ballroom.toml";

/// Command-line overrides, applied after the file and the environment
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Number of leaders
    #[arg(short = 'l', long)]
    pub leaders: Option<usize>,

    /// Number of followers
    #[arg(short = 'f', long)]
    pub followers: Option<usize>,

    /// Close the floor after this many milliseconds
    #[arg(long)]
    pub run_for_ms: Option<u64>,

    /// Stop every dancer after this many dances
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Seed for the delay generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Any config key, as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

impl Overrides {
    fn apply(&self, config: &mut BallroomConfig) -> Result<()> {
        for assignment in &self.set {
            config
                .apply_override(assignment)
                .with_context(|| format!("Invalid --set {assignment}"))?;
        }
        if let Some(leaders) = self.leaders {
            config.leaders = leaders;
        }
        if let Some(followers) = self.followers {
            config.followers = followers;
        }
        if let Some(run_for_ms) = self.run_for_ms {
            config.run_for_ms = Some(run_for_ms);
        }
        if let Some(cycles) = self.cycles {
            config.cycles_per_dancer = Some(cycles);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        Ok(())
    }
}

/// Build the effective configuration: defaults, then the file, then
/// `BALLROOM_*` variables, then the command line. The result is validated.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<BallroomConfig> {
    let mut config = match path {
        Some(path) => BallroomConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                debug!(path = %fallback.display(), "loading default config file");
                BallroomConfig::load_from_file(&fallback)?
            } else {
                BallroomConfig::default()
            }
        }
    };

    config
        .merge_with_env()
        .context("Invalid BALLROOM_* environment variable")?;
    overrides.apply(&mut config)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
