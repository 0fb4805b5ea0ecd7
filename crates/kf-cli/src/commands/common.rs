//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use kf_core::Config;
use kf_pipeline::{IngestReport, RunSummary};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Config file read when `--config` is not given
pub(crate) const DEFAULT_CONFIG_FILE: &str = "kpiflow.yml";

/// Exit code for a run whose ingestion had per-source failures
pub(crate) const EXIT_INGEST_FAILURES: i32 = 4;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors (the run lock among them) run first.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; nothing to show the user.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load configuration and apply command-line overrides.
///
/// An explicit `--config` must exist. Without it, `kpiflow.yml` in the
/// working directory is used when present and built-in defaults otherwise.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Config::load(Path::new(DEFAULT_CONFIG_FILE)).context("Failed to load kpiflow.yml")?
        }
        None => {
            log::info!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Config::new("kpiflow")
        }
    };

    apply_overrides(&mut config, global);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(database) = &global.database {
        log::debug!("Database path overridden: {}", database);
        config.database.path = database.clone();
    }
    if let Some(data_dir) = &global.data_dir {
        log::debug!("Data directory overridden: {}", data_dir);
        config.sources.data_dir = PathBuf::from(data_dir);
    }
}

/// Print one line per source of an ingestion report
pub(crate) fn print_ingest_report(report: &IngestReport) {
    for loaded in &report.loaded {
        println!("  [ok]   {:<12} {} rows", loaded.entity, loaded.rows);
    }
    for failed in &report.failed {
        println!("  [fail] {:<12} {}", failed.entity, failed.error.report());
    }
    println!(
        "\nIngested {} of {} sources",
        report.loaded.len(),
        report.loaded.len() + report.failed.len()
    );
}

/// Print a run summary as text or JSON
pub(crate) fn print_run_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?
        );
        return Ok(());
    }

    for outcome in &summary.stages {
        println!(
            "  {} built: {} rows [{}ms]",
            outcome.stage, outcome.rows, outcome.duration_ms
        );
    }
    println!("\nRun {} finished: {}", summary.run_id, summary.state);
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
