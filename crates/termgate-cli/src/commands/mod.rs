//! Command handlers

pub mod capabilities;
pub mod config;
pub mod serve;

use anyhow::Context;
use termgate_config::{AppConfig, ConfigManager, ConfigStore};

use crate::cli::{Cli, Commands};
use crate::logging;

/// Load configuration, install logging and dispatch
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Capabilities { domain } => {
            logging::init(cli.log_level.as_deref(), None)?;
            capabilities::run(domain)
        }
        Commands::Serve { port } => {
            let config = load(&cli)?;
            logging::init(cli.log_level.as_deref(), Some(&config.logging.level))?;
            serve::run(&config, port).await
        }
        Commands::Config => {
            let config = load(&cli)?;
            logging::init(cli.log_level.as_deref(), Some(&config.logging.level))?;
            config::run(&config)
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    manager
        .load_config()
        .with_context(|| format!("failed to load {}", manager.config_path().display()))
}
