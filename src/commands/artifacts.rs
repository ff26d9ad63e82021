//! Fetch and sweep commands for staged artifacts

use crate::cli::FetchArgs;
use crate::config::Settings;
use crate::export::ArtifactStore;
use crate::output;
use anyhow::Context;
use console::style;
use std::path::PathBuf;

/// Copy a live artifact out of the export directory
pub fn run_fetch(args: FetchArgs, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = ArtifactStore::new(&settings.export);
    let (artifact, bytes) = store.fetch(&args.name)?;

    let destination = args
        .output
        .unwrap_or_else(|| PathBuf::from(&artifact.name));
    std::fs::write(&destination, &bytes)
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    if json {
        output::print_json(&serde_json::json!({
            "artifact": artifact,
            "output": destination,
        }))?;
    } else {
        println!(
            "  {} Saved {} to {} ({} bytes, expires {})",
            style("✓").green(),
            style(&artifact.name).bold(),
            destination.display(),
            bytes.len(),
            artifact.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

/// Remove expired artifacts; meant to be run periodically
pub fn run_sweep(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = ArtifactStore::new(&settings.export);
    let report = store.sweep()?;

    if json {
        output::print_json(&report)?;
    } else {
        output::print_sweep_report(&report);
    }

    Ok(())
}
