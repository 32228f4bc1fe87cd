//! Reactor Sync CLI
//!
//! Keeps a file-based checkout of a Reactor property in sync with the
//! remote service.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::InitOptions;
use error::{CliError, Result};
use reactor_core::SyncDirection;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::user(format!("cannot set up logging: {e}")))?;
    tracing::debug!("Verbose mode enabled");

    let cwd = std::env::current_dir()?;
    let token = cli.access_token.as_deref();

    match cli.command.unwrap_or_default() {
        Commands::Sync {
            modified,
            behind,
            batch_by,
        } => {
            let direction = SyncDirection::from_flags(modified, behind);
            commands::run_sync(&cwd, &cli.settings, token, direction, batch_by).await
        }
        Commands::Pull { batch_by } => {
            commands::run_pull(&cwd, &cli.settings, token, batch_by).await
        }
        Commands::Diff { json } => commands::run_diff(&cwd, &cli.settings, token, json).await,
        Commands::Init {
            property_id,
            reactor_url,
            jwt,
            oauth,
            client_id,
            client_secret,
            org_id,
            force,
        } => commands::run_init(
            &cwd,
            &cli.settings,
            InitOptions {
                property_id,
                reactor_url,
                jwt,
                oauth,
                client_id,
                client_secret,
                org_id,
                force,
            },
        ),
    }
}
