//! `ballroom config`: print the effective configuration.

use super::{load_config, Overrides};
use anyhow::Result;
use clap::Args;
use std::path::Path;

/// Show the configuration a run would use
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(flatten)]
    pub overrides: Overrides,
}

/// Render the effective configuration as TOML
pub fn render(cmd: &ConfigCommand, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path, &cmd.overrides)?;
    let mut rendered = config.to_toml()?;
    if config.liveness_timeout_ms.is_none() {
        rendered.push_str(&format!(
            "# liveness_timeout_ms derived as {}\n",
            config.liveness_timeout().as_millis()
        ));
    }
    Ok(rendered)
}

/// Handle config command execution
pub fn handle_config(cmd: &ConfigCommand, config_path: Option<&Path>) -> Result<()> {
    print!("{}", render(cmd, config_path)?);
    Ok(())
}
