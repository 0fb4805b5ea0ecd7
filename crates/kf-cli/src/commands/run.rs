//! Run command implementation: ingest, then transform.

use anyhow::{Context, Result};
use kf_pipeline::Orchestrator;

use crate::cli::{GlobalArgs, TransformArgs};
use crate::commands::common::{
    print_ingest_report, print_run_summary, ExitCode, EXIT_INGEST_FAILURES,
};
use crate::commands::transform::transform_config;

/// Execute the run command
pub async fn execute(args: &TransformArgs, global: &GlobalArgs) -> Result<()> {
    let config = transform_config(args, global)?;

    let mut orchestrator = Orchestrator::new(config);
    let (report, summary) = orchestrator.run_all().await.context("Pipeline run failed")?;

    if !args.json {
        print_ingest_report(&report);
        println!();
    }
    print_run_summary(&summary, args.json)?;

    // Tables were built, but from incomplete raw data.
    if !report.is_success() {
        return Err(ExitCode(EXIT_INGEST_FAILURES).into());
    }
    Ok(())
}
