//! Ballroom configuration
//!
//! Layered the usual way: defaults, then a TOML file, then `BALLROOM_*`
//! environment variables, then `key=value` overrides from the command line.
//! [`BallroomConfig::validate`] runs last.

mod validation;

pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use crate::{BallroomError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `BALLROOM_LEADERS=8`.
pub const ENV_PREFIX: &str = "BALLROOM_";

/// Keys accepted by [`BallroomConfig::set_from_string`].
pub const KEYS: [&str; 8] = [
    "leaders",
    "followers",
    "max_arrival_delay_ms",
    "max_dance_ms",
    "liveness_timeout_ms",
    "run_for_ms",
    "cycles_per_dancer",
    "seed",
];

/// Population sizes, delay distribution and liveness bound for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BallroomConfig {
    /// Number of leader actors
    pub leaders: usize,
    /// Number of follower actors
    pub followers: usize,
    /// Upper bound of the uniform preparation delay before each arrival
    pub max_arrival_delay_ms: u64,
    /// Upper bound of the uniform dance duration
    pub max_dance_ms: u64,
    /// Bound on every blocking wait; derived from the delays when unset
    pub liveness_timeout_ms: Option<u64>,
    /// Close the floor after this long; run until interrupted when unset
    pub run_for_ms: Option<u64>,
    /// Stop each actor after this many dances
    pub cycles_per_dancer: Option<u64>,
    /// Seed for the delay generator; drawn from the OS when unset
    pub seed: Option<u64>,
}

impl Default for BallroomConfig {
    fn default() -> Self {
        Self {
            leaders: 5,
            followers: 5,
            max_arrival_delay_ms: 5000,
            max_dance_ms: 5000,
            liveness_timeout_ms: None,
            run_for_ms: None,
            cycles_per_dancer: None,
            seed: None,
        }
    }
}

impl BallroomConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BallroomError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge `BALLROOM_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge `BALLROOM_*` entries from an arbitrary variable list.
    ///
    /// Variables with the prefix but an unknown key are rejected so typos
    /// do not pass silently.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.as_ref().strip_prefix(ENV_PREFIX) {
                self.set_from_string(&config_key.to_lowercase(), value.as_ref())?;
            }
        }
        Ok(())
    }

    /// Set a single value from its string form. Optional keys accept `none`.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "leaders" => self.leaders = parse(key, value)?,
            "followers" => self.followers = parse(key, value)?,
            "max_arrival_delay_ms" => self.max_arrival_delay_ms = parse(key, value)?,
            "max_dance_ms" => self.max_dance_ms = parse(key, value)?,
            "liveness_timeout_ms" => self.liveness_timeout_ms = parse_optional(key, value)?,
            "run_for_ms" => self.run_for_ms = parse_optional(key, value)?,
            "cycles_per_dancer" => self.cycles_per_dancer = parse_optional(key, value)?,
            "seed" => self.seed = parse_optional(key, value)?,
            _ => {
                return Err(BallroomError::config(format!(
                    "Unknown key '{key}' (expected one of: {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Apply a `key=value` override
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            BallroomError::config(format!("Expected key=value, got '{assignment}'"))
        })?;
        self.set_from_string(key.trim(), value)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();
        validator
            .custom(
                "leaders",
                self.total_dancers() > 0,
                "at least one dancer is required across both roles",
            )
            .range(
                "liveness_timeout_ms",
                self.liveness_timeout().as_millis() as f64,
                Some(1.0),
                None,
            );

        if let Some(cycles) = self.cycles_per_dancer {
            validator
                .range("cycles_per_dancer", cycles as f64, Some(1.0), None)
                .custom(
                    "cycles_per_dancer",
                    self.leaders == self.followers,
                    "a per-dancer cycle limit requires equal leader and follower populations",
                );
        }
        if let Some(run_for) = self.run_for_ms {
            validator.range("run_for_ms", run_for as f64, Some(1.0), None);
        }

        validator.result()?;
        Ok(())
    }

    /// Total actors across both roles
    pub fn total_dancers(&self) -> usize {
        self.leaders + self.followers
    }

    /// Bound on every blocking wait.
    ///
    /// When not configured it is twice the longest single delay times the
    /// larger population: a dancer may have to sit out one full
    /// arrive-and-dance turn of every member of the bigger role.
    pub fn liveness_timeout(&self) -> Duration {
        let ms = self.liveness_timeout_ms.unwrap_or_else(|| {
            let longest = self.max_arrival_delay_ms.max(self.max_dance_ms);
            let crowd = self.leaders.max(self.followers).max(1) as u64;
            longest.saturating_mul(2).saturating_mul(crowd).max(1)
        });
        Duration::from_millis(ms)
    }

    /// How long to keep the floor open, if bounded
    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| BallroomError::config(format!("Invalid value '{value}' for '{key}': {e}")))
}

fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    if value.eq_ignore_ascii_case("none") || value.is_empty() {
        Ok(None)
    } else {
        parse(key, value).map(Some)
    }
}
