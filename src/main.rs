//! Chain Reactor CLI entry point.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use chain_reactor::application::ReactionStatus;
use chain_reactor::cli::{commands, handle_error, Cli, Commands};
use chain_reactor::domain::models::Config;
use chain_reactor::infrastructure::config::ConfigLoader;
use chain_reactor::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command, cli.config, cli.json).await {
        Ok(ReactionStatus::Success) => ExitCode::SUCCESS,
        Ok(ReactionStatus::Failed) => ExitCode::FAILURE,
        Err(err) => handle_error(&err, cli.json),
    }
}

async fn run(
    command: Commands,
    config_path: Option<std::path::PathBuf>,
    json_mode: bool,
) -> Result<ReactionStatus> {
    let config: Config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    // Keep the guard alive so buffered file logs are flushed on exit
    let _logger = LoggerImpl::init(&LogConfig::from_settings(&config.logging)?)?;

    match command {
        Commands::React(args) => commands::react::execute(args, config, json_mode).await,
        Commands::Roles => commands::roles::execute(json_mode).map(|()| ReactionStatus::Success),
        Commands::Config => {
            commands::config::execute(config, json_mode).map(|()| ReactionStatus::Success)
        }
    }
}
