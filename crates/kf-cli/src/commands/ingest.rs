//! Ingest command implementation

use anyhow::{Context, Result};
use kf_pipeline::Orchestrator;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_config, print_ingest_report, ExitCode, EXIT_INGEST_FAILURES};

/// Execute the ingest command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    println!(
        "Ingesting {} sources from {}\n",
        config.sources.files.len(),
        config.sources.data_dir.display()
    );

    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator.ingest().await.context("Ingestion failed")?;

    print_ingest_report(&report);
    if !report.is_success() {
        return Err(ExitCode(EXIT_INGEST_FAILURES).into());
    }
    Ok(())
}
