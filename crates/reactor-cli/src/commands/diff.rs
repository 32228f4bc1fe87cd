//! Diff command implementation
//!
//! Classifies every resource without changing anything.

use std::path::Path;

use colored::{ColoredString, Colorize};
use serde_json::json;

use reactor_core::{Comparison, ComparisonStatus, DiffReport};

use crate::context::Context;
use crate::error::Result;

/// Run the diff command
pub async fn run_diff(
    cwd: &Path,
    settings_path: &Path,
    access_token: Option<&str>,
    json: bool,
) -> Result<()> {
    let context = Context::load(cwd, settings_path)?;
    let engine = context.engine(access_token, crate::cli::DEFAULT_BATCH_SIZE)?;
    let report = engine.diff().await?;

    if json {
        let counts: serde_json::Map<String, serde_json::Value> = ComparisonStatus::ALL
            .iter()
            .map(|status| (status.to_string().to_lowercase(), json!(report.count(*status))))
            .collect();
        let output = json!({
            "property_id": context.settings.property_id,
            "has_changes": report.has_changes(),
            "counts": counts,
            "comparisons": report.comparisons,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&context.settings.property_id, &report);
    }

    Ok(())
}

/// Print human-readable classification, one section per status
pub fn print_report(property_id: &str, report: &DiffReport) {
    println!("{} {}", "Diff".blue().bold(), property_id.yellow());
    println!();

    if !report.has_changes() {
        println!(
            "{} {} resources unchanged. Property is in sync.",
            "OK".green().bold(),
            report.count(ComparisonStatus::Unchanged)
        );
        return;
    }

    for status in ComparisonStatus::ALL {
        if status == ComparisonStatus::Unchanged {
            continue;
        }
        let items = report.with_status(status);
        if items.is_empty() {
            continue;
        }
        println!("{} ({})", status.to_string().bold(), items.len());
        for item in items {
            print_comparison(item);
        }
        println!();
    }

    println!(
        "{} unchanged. Run {} to apply.",
        report.count(ComparisonStatus::Unchanged),
        "reactor-sync sync".cyan()
    );
}

fn print_comparison(item: &Comparison) {
    println!(
        "  {} {} {}",
        marker(item.status),
        item.id,
        item.kind.to_string().dimmed()
    );
    for (key, delta) in &item.attributes {
        println!(
            "      {}: {} {} {}",
            key,
            delta.local.as_deref().unwrap_or("(none)").yellow(),
            "=>".dimmed(),
            delta.remote.as_deref().unwrap_or("(none)").cyan()
        );
    }
}

fn marker(status: ComparisonStatus) -> ColoredString {
    match status {
        ComparisonStatus::Added => "+".green(),
        ComparisonStatus::Modified => "~".yellow(),
        ComparisonStatus::Deleted => "-".red(),
        ComparisonStatus::Behind => "<".cyan(),
        ComparisonStatus::Unchanged => " ".normal(),
    }
}
