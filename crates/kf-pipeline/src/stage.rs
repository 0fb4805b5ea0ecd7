//! Transformation stages and the shared statement runner they use.

use crate::error::PipelineError;
use crate::materialize::materialize;
use kf_core::{Entity, PipelineState, FACT_TABLE, INTERMEDIATE_TABLE};
use kf_db::Database;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// A transformation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Stage 1: enrollments joined to participants
    Intermediate,
    /// Stage 2: intermediate rows enriched with courses and feedback
    Fact,
}

impl Stage {
    /// Table the stage rebuilds
    pub fn table(self) -> &'static str {
        match self {
            Stage::Intermediate => INTERMEDIATE_TABLE,
            Stage::Fact => FACT_TABLE,
        }
    }

    /// Tables that must exist before the stage can run
    pub fn upstream(self) -> Vec<&'static str> {
        match self {
            Stage::Intermediate => vec![
                Entity::Enrollments.table_name(),
                Entity::Participants.table_name(),
            ],
            Stage::Fact => vec![
                INTERMEDIATE_TABLE,
                Entity::Courses.table_name(),
                Entity::Feedbacks.table_name(),
            ],
        }
    }

    /// Run state reached once the stage's table is committed
    pub fn completed_state(self) -> PipelineState {
        match self {
            Stage::Intermediate => PipelineState::Stage1Built,
            Stage::Fact => PipelineState::Stage2Built,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Intermediate => write!(f, "stage-1 ({})", INTERMEDIATE_TABLE),
            Stage::Fact => write!(f, "stage-2 ({})", FACT_TABLE),
        }
    }
}

/// Result of a successful stage
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub table: String,
    pub rows: usize,
    pub duration_ms: u64,
}

/// Check upstream tables, then rebuild the stage's table from `select_sql`.
pub(crate) async fn run_stage(
    db: &dyn Database,
    stage: Stage,
    select_sql: &str,
) -> Result<StageOutcome, PipelineError> {
    let start = Instant::now();
    log::info!("Building {}", stage);

    let result = rebuild(db, stage, select_sql).await;

    match result {
        Ok(rows) => {
            let duration = start.elapsed();
            log::info!(
                "{} rebuilt: {} rows [{}ms]",
                stage,
                rows,
                duration.as_millis()
            );
            Ok(StageOutcome {
                stage,
                table: stage.table().to_string(),
                rows,
                duration_ms: duration.as_millis() as u64,
            })
        }
        Err(e) => {
            log::error!("{}", e.report());
            Err(e)
        }
    }
}

async fn rebuild(db: &dyn Database, stage: Stage, select_sql: &str) -> Result<usize, PipelineError> {
    for table in stage.upstream() {
        let exists = db
            .relation_exists(table)
            .await
            .map_err(|source| PipelineError::QueryExecution { stage, source })?;
        if !exists {
            return Err(PipelineError::UpstreamMissing {
                stage,
                table: table.to_string(),
            });
        }
    }
    materialize(db, stage.table(), select_sql)
        .await
        .map_err(|source| PipelineError::QueryExecution { stage, source })
}
