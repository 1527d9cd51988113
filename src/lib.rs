pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch, normalize and persist every configured asset.
    Collect { output: Option<PathBuf> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("assetdigest starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let primary = providers::build_provider(config.providers.primary, &config)?;
    let secondary = config
        .providers
        .secondary
        .map(|kind| providers::build_provider(kind, &config))
        .transpose()?;

    match command {
        AppCommand::Collect { output } => {
            let output = match output {
                Some(path) => path,
                None => config.output_path()?,
            };
            cli::collect::run(&config, primary.as_ref(), secondary.as_deref(), &output).await
        }
    }
}
