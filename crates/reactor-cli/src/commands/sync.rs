//! Sync and pull command implementations

use std::path::Path;

use colored::Colorize;

use reactor_core::{ComparisonStatus, SyncDirection, SyncPhase, SyncProgress, SyncReport};

use crate::context::Context;
use crate::error::{CliError, Result};

/// Progress lines on stdout, one per phase start and per completed step
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl SyncProgress for ConsoleProgress {
    fn started(&self, phase: SyncPhase, total: usize) {
        let label = match phase {
            SyncPhase::Push => "Syncing Modified",
            SyncPhase::Pull => "Syncing Behind",
        };
        println!("{} {} ({})", "=>".blue().bold(), label, total);
    }

    fn advanced(&self, phase: SyncPhase, completed: usize) {
        println!("   {} {} done", phase.to_string().dimmed(), completed);
    }
}

/// Run the sync command
///
/// Compares the checkout with the remote property, then pushes Modified
/// and pulls Behind resources as the direction flags allow.
pub async fn run_sync(
    cwd: &Path,
    settings_path: &Path,
    access_token: Option<&str>,
    direction: SyncDirection,
    batch_size: usize,
) -> Result<()> {
    let context = Context::load(cwd, settings_path)?;
    let engine = context.engine(access_token, batch_size)?;

    println!(
        "{} Comparing {}...",
        "=>".blue().bold(),
        context.settings.property_id.yellow()
    );
    let report = engine.diff().await?;
    println!(
        "   {} modified, {} behind, {} added, {} deleted, {} unchanged",
        report.count(ComparisonStatus::Modified),
        report.count(ComparisonStatus::Behind),
        report.count(ComparisonStatus::Added),
        report.count(ComparisonStatus::Deleted),
        report.count(ComparisonStatus::Unchanged)
    );

    let outcome = engine.sync(&report, direction, &ConsoleProgress).await?;
    finish(&outcome)
}

/// Run the pull command: check out every remote resource.
pub async fn run_pull(
    cwd: &Path,
    settings_path: &Path,
    access_token: Option<&str>,
    batch_size: usize,
) -> Result<()> {
    let context = Context::load(cwd, settings_path)?;
    let engine = context.engine(access_token, batch_size)?;

    println!(
        "{} Pulling {} into {}",
        "=>".blue().bold(),
        context.settings.property_id.yellow(),
        context.property_root.display().to_string().cyan()
    );
    let outcome = engine.pull_all(&ConsoleProgress).await?;
    finish(&outcome)
}

fn finish(outcome: &SyncReport) -> Result<()> {
    if outcome.success() {
        println!(
            "{} {} pushed, {} pulled.",
            "OK".green().bold(),
            outcome.pushed.len(),
            outcome.pulled.len()
        );
        return Ok(());
    }

    println!();
    println!("{}", "Failures:".red().bold());
    for failure in &outcome.failures {
        println!(
            "  {} {} {} ({}): {}",
            "!".red(),
            failure.phase.to_string().dimmed(),
            failure.id.cyan(),
            failure.kind,
            failure.message
        );
    }
    Err(CliError::user(format!(
        "{} of {} resources failed to sync",
        outcome.failures.len(),
        outcome.failures.len() + outcome.pushed.len() + outcome.pulled.len()
    )))
}
