//! Transform command implementation

use anyhow::{Context, Result};
use kf_core::Config;
use kf_pipeline::Orchestrator;

use crate::cli::{GlobalArgs, TransformArgs};
use crate::commands::common::{load_config, print_run_summary};

/// Load config and apply the transform-specific overrides
pub(crate) fn transform_config(args: &TransformArgs, global: &GlobalArgs) -> Result<Config> {
    let mut config = load_config(global)?;
    if let Some(policy) = args.feedback_policy {
        config.pipeline.feedback_policy = policy.into();
    }
    Ok(config)
}

/// Execute the transform command
pub async fn execute(args: &TransformArgs, global: &GlobalArgs) -> Result<()> {
    let config = transform_config(args, global)?;
    log::info!(
        "Transforming into {} (feedback policy: {})",
        config.database.path,
        config.pipeline.feedback_policy
    );

    let mut orchestrator = Orchestrator::new(config);
    let summary = orchestrator.run().await.context("Transformation failed")?;

    print_run_summary(&summary, args.json)
}
