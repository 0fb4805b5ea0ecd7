//! Run sequencing: lock, connect, stage 1, stage 2.

use crate::error::PipelineError;
use crate::fact::build_fact;
use crate::ingest::{ingest_sources, IngestReport};
use crate::intermediate::build_intermediate;
use crate::lock::RunLock;
use crate::stage::{Stage, StageOutcome};
use kf_core::{Config, PipelineState, RunState};
use kf_db::{Database, DbError, DuckDbBackend};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// What a finished run reports
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub state: PipelineState,
    pub stages: Vec<StageOutcome>,
}

impl RunSummary {
    fn new(state: &RunState, stages: Vec<StageOutcome>) -> Self {
        Self {
            run_id: state.run_id.clone(),
            state: state.state(),
            stages,
        }
    }

    /// Rows written by `stage`, if it ran
    pub fn rows_for(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().find(|o| o.stage == stage).map(|o| o.rows)
    }
}

/// Drives ingestion and the two transformation stages against one store.
///
/// Stages run strictly in order and stage 2 only starts once stage 1's table
/// is committed. The first failure ends the run; nothing is retried.
///
/// Every step is bounded by `pipeline.stage_timeout_secs`. DuckDB statements
/// cannot be interrupted from outside, so a statement still running when its
/// step times out finishes on the blocking pool after the run lock has been
/// released. Pending ingestion loads are aborted, and a stage only publishes
/// its table through the final swap, so at most that one statement lands late.
pub struct Orchestrator {
    config: Config,
    db: Option<Arc<dyn Database>>,
}

impl Orchestrator {
    /// Orchestrator that opens the configured DuckDB store on first use
    pub fn new(config: Config) -> Self {
        Self { config, db: None }
    }

    /// Orchestrator over an already open store
    pub fn with_database(config: Config, db: Arc<dyn Database>) -> Self {
        Self {
            config,
            db: Some(db),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn timeout_secs(&self) -> u64 {
        self.config.pipeline.stage_timeout_secs
    }

    /// Open (or re-check) the store, bounded by the stage timeout.
    pub async fn connect(&mut self) -> Result<Arc<dyn Database>, PipelineError> {
        let secs = self.timeout_secs();
        let db = match &self.db {
            Some(db) => Arc::clone(db),
            None => {
                let path = self.config.database.path.clone();
                log::info!("Connecting to {}", path);
                let opened = bounded("connect", secs, async move {
                    tokio::task::spawn_blocking(move || DuckDbBackend::new(&path))
                        .await
                        .map_err(|e| {
                            PipelineError::Connection(DbError::Internal(format!(
                                "connect task failed: {e}"
                            )))
                        })?
                        .map_err(PipelineError::Connection)
                })
                .await?;
                let db: Arc<dyn Database> = Arc::new(opened);
                self.db = Some(Arc::clone(&db));
                db
            }
        };

        bounded("connect", secs, async {
            db.ping().await.map_err(PipelineError::Connection)
        })
        .await?;
        Ok(db)
    }

    /// Replace every raw table from the configured CSV sources.
    pub async fn ingest(&mut self) -> Result<IngestReport, PipelineError> {
        let run_id = RunState::new().run_id;
        let _lock = RunLock::acquire(&self.config.database, &run_id)?;
        let db = self.connect().await?;
        self.ingest_with(db).await
    }

    /// Rebuild both derived tables.
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let mut state = RunState::new();
        self.run_with_state(&mut state).await
    }

    /// Rebuild both derived tables, recording transitions in `state`.
    ///
    /// On failure `state` ends in [`PipelineState::Failed`] with the error
    /// message attached.
    pub async fn run_with_state(
        &mut self,
        state: &mut RunState,
    ) -> Result<RunSummary, PipelineError> {
        let result = self.locked_transform(state).await;
        finish(state, result)
    }

    /// Ingest every source, then rebuild both derived tables under one lock.
    ///
    /// Per-source ingestion failures do not stop the transformation; a
    /// missing input table surfaces as [`PipelineError::UpstreamMissing`].
    pub async fn run_all(&mut self) -> Result<(IngestReport, RunSummary), PipelineError> {
        let mut state = RunState::new();
        let result = self.locked_ingest_and_transform(&mut state).await;
        finish(&mut state, result)
    }

    async fn locked_transform(&mut self, state: &mut RunState) -> Result<RunSummary, PipelineError> {
        log::info!("Starting run {}", state.run_id);
        let _lock = RunLock::acquire(&self.config.database, &state.run_id)?;
        let db = self.connect().await?;
        state.advance(PipelineState::Connected)?;
        self.transform(db.as_ref(), state).await
    }

    async fn locked_ingest_and_transform(
        &mut self,
        state: &mut RunState,
    ) -> Result<(IngestReport, RunSummary), PipelineError> {
        log::info!("Starting run {}", state.run_id);
        let _lock = RunLock::acquire(&self.config.database, &state.run_id)?;
        let db = self.connect().await?;
        state.advance(PipelineState::Connected)?;
        let report = self.ingest_with(Arc::clone(&db)).await?;
        let summary = self.transform(db.as_ref(), state).await?;
        Ok((report, summary))
    }

    async fn ingest_with(&self, db: Arc<dyn Database>) -> Result<IngestReport, PipelineError> {
        bounded(
            "ingest",
            self.timeout_secs(),
            ingest_sources(db, &self.config.sources),
        )
        .await
    }

    async fn transform(
        &self,
        db: &dyn Database,
        state: &mut RunState,
    ) -> Result<RunSummary, PipelineError> {
        let secs = self.timeout_secs();
        let mut stages = Vec::with_capacity(2);

        let outcome = bounded(
            &Stage::Intermediate.to_string(),
            secs,
            build_intermediate(db),
        )
        .await?;
        state.advance(Stage::Intermediate.completed_state())?;
        stages.push(outcome);

        let outcome = bounded(
            &Stage::Fact.to_string(),
            secs,
            build_fact(db, self.config.pipeline.feedback_policy),
        )
        .await?;
        state.advance(Stage::Fact.completed_state())?;
        stages.push(outcome);

        log::info!(
            "Run {} finished: {}",
            state.run_id,
            stages
                .iter()
                .map(|o| format!("{} = {} rows", o.table, o.rows))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(RunSummary::new(state, stages))
    }
}

/// Await `fut`, failing with [`PipelineError::Timeout`] after `secs`.
async fn bounded<T, F>(step: &str, secs: u64, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout {
            step: step.to_string(),
            secs,
        }),
    }
}

/// Move `state` to Failed when `result` is an error.
fn finish<T>(state: &mut RunState, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
    if let Err(e) = &result {
        let report = e.report();
        log::error!("Run {} failed: {}", state.run_id, report);
        if !state.state().is_terminal() {
            if let Err(fail_err) = state.fail(report) {
                log::warn!("{}", fail_err);
            }
        }
    }
    result
}
