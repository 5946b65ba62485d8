//! Ballroom command-line runner
//!
//! Runs the leader/follower dance-floor simulation and reports how every
//! dancer fared.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    config::{handle_config, ConfigCommand},
    run::{handle_run, RunCommand},
};

#[derive(Parser, Debug)]
#[command(name = "ballroom")]
#[command(about = "Ballroom - leaders and followers sharing a single dance floor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (defaults to ./ballroom.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the simulation
    Run(RunCommand),

    /// Print the effective configuration as TOML
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(cmd) => {
            handle_run(cmd, cli.config.as_deref()).await?;
        }

        Commands::Config(cmd) => {
            handle_config(&cmd, cli.config.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "ballroom",
            "--verbose",
            "run",
            "--leaders",
            "3",
            "-f",
            "2",
            "--run-for-ms",
            "500",
            "--set",
            "max_dance_ms=10",
            "--set",
            "seed=7",
            "--json",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Run(cmd) = cli.command else {
            panic!("expected run");
        };
        assert!(cmd.json);
        assert_eq!(cmd.overrides.leaders, Some(3));
        assert_eq!(cmd.overrides.followers, Some(2));
        assert_eq!(cmd.overrides.run_for_ms, Some(500));
        assert_eq!(cmd.overrides.set, ["max_dance_ms=10", "seed=7"]);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["ballroom", "config", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Config(_)));
    }
}
