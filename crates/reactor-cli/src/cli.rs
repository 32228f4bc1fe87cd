//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reactor_core::config::DEFAULT_SETTINGS_PATH;

/// Default number of resources fetched together when pulling
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Reactor Sync - Keep a local checkout of a Reactor property in sync
#[derive(Parser, Debug)]
#[command(name = "reactor-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Bearer token for the Reactor API (overrides the settings file)
    #[arg(long, global = true, env = "REACTOR_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// The command to run (defaults to sync)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Push local edits and pull remote changes
    ///
    /// Without flags both directions run, push first.
    ///
    /// Examples:
    ///   reactor-sync sync              # Push Modified, then pull Behind
    ///   reactor-sync sync --modified   # Push only
    ///   reactor-sync sync --behind -b 10
    Sync {
        /// Only push resources edited locally
        #[arg(long)]
        modified: bool,

        /// Only pull resources changed remotely
        #[arg(long)]
        behind: bool,

        /// Resources fetched together per pull batch
        #[arg(short = 'b', long = "batch-by", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_by: usize,
    },

    /// Check out every resource of the property
    Pull {
        /// Resources written together per batch
        #[arg(short = 'b', long = "batch-by", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_by: usize,
    },

    /// Compare the local checkout with the remote property
    Diff {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write a settings file and create the property directory
    Init {
        /// Property to check out
        #[arg(long)]
        property_id: String,

        /// Reactor API base URL
        #[arg(long, default_value = reactor_client::DEFAULT_REACTOR_URL)]
        reactor_url: String,

        /// JWT token exchange endpoint
        #[arg(long)]
        jwt: Option<String>,

        /// OAuth token exchange endpoint
        #[arg(long)]
        oauth: Option<String>,

        /// Integration client id
        #[arg(long)]
        client_id: String,

        /// Integration client secret
        #[arg(long)]
        client_secret: String,

        /// Organization id
        #[arg(long)]
        org_id: Option<String>,

        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Sync {
            modified: false,
            behind: false,
            batch_by: DEFAULT_BATCH_SIZE,
        }
    }
}
