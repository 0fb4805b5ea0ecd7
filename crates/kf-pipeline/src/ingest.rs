//! Raw CSV ingestion.
//!
//! Each configured source replaces its raw table in full. Sources load as
//! independent tasks; a failing source is reported and never stops the rest.

use crate::error::PipelineError;
use futures::future::join_all;
use kf_core::{Entity, SourceFile, SourcesConfig};
use kf_db::{CsvLoadOptions, Database, DbError};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A source that was loaded
#[derive(Debug, Clone, Serialize)]
pub struct LoadedSource {
    pub entity: Entity,
    pub table: String,
    pub rows: usize,
}

/// A source that could not be loaded
#[derive(Debug)]
pub struct FailedSource {
    pub entity: Entity,
    pub error: PipelineError,
}

/// Outcome of one ingestion run
#[derive(Debug, Default)]
pub struct IngestReport {
    pub loaded: Vec<LoadedSource>,
    pub failed: Vec<FailedSource>,
}

impl IngestReport {
    /// True when every configured source loaded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Rows loaded for `entity`, if it loaded
    pub fn rows_for(&self, entity: Entity) -> Option<usize> {
        self.loaded
            .iter()
            .find(|l| l.entity == entity)
            .map(|l| l.rows)
    }
}

/// Per-source load tasks, aborted if ingestion is abandoned before they join.
///
/// Abort only takes effect at an await point: a statement already running on
/// the blocking pool still completes, but no further statement is issued.
struct LoadTasks(Vec<JoinHandle<Result<LoadedSource, PipelineError>>>);

impl Drop for LoadTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Load every configured source into its raw table.
///
/// The store is pinged first; an unreachable store aborts with
/// [`PipelineError::Connection`] before any file is read. Per-source failures
/// end up in [`IngestReport::failed`].
pub async fn ingest_sources(
    db: Arc<dyn Database>,
    sources: &SourcesConfig,
) -> Result<IngestReport, PipelineError> {
    db.ping().await.map_err(PipelineError::Connection)?;

    log::info!(
        "Ingesting {} sources from {}",
        sources.files.len(),
        sources.data_dir.display()
    );

    let mut tasks = LoadTasks(
        sources
            .files
            .iter()
            .map(|source| {
                let db = Arc::clone(&db);
                let source = source.clone();
                let path = sources.path_of(&source).display().to_string();
                tokio::spawn(async move { load_source(db.as_ref(), &source, &path).await })
            })
            .collect(),
    );

    let mut report = IngestReport::default();
    let joined_all = join_all(tasks.0.iter_mut()).await;
    for (source, joined) in sources.files.iter().zip(joined_all) {
        let result = joined.unwrap_or_else(|e| {
            Err(PipelineError::Load {
                entity: source.entity,
                source: DbError::Internal(format!("load task failed: {e}")),
            })
        });
        match result {
            Ok(loaded) => report.loaded.push(loaded),
            Err(error) => {
                log::warn!("{}", error.report());
                report.failed.push(FailedSource {
                    entity: source.entity,
                    error,
                });
            }
        }
    }

    log::info!(
        "Ingestion finished: {} loaded, {} failed",
        report.loaded.len(),
        report.failed.len()
    );
    Ok(report)
}

async fn load_source(
    db: &dyn Database,
    source: &SourceFile,
    path: &str,
) -> Result<LoadedSource, PipelineError> {
    let entity = source.entity;
    let table = entity.table_name();

    if !std::path::Path::new(path).is_file() {
        return Err(PipelineError::SourceNotFound {
            entity,
            path: path.to_string(),
        });
    }

    let options = match entity.columns() {
        Some(columns) => {
            let header = db
                .csv_header(path)
                .await
                .map_err(|source| PipelineError::Load { entity, source })?;
            let missing = entity.missing_columns(&header);
            if !missing.is_empty() {
                return Err(PipelineError::SchemaMismatch {
                    entity,
                    missing: missing.join(", "),
                });
            }
            CsvLoadOptions::typed(columns)
        }
        None => CsvLoadOptions::inferred(),
    };

    db.load_csv(table, path, &options)
        .await
        .map_err(|source| PipelineError::Load { entity, source })?;

    let rows = db
        .query_count(&format!("SELECT * FROM {}", table))
        .await
        .map_err(|source| PipelineError::Load { entity, source })?;

    log::info!("Loaded {} rows into {} from {}", rows, table, path);
    Ok(LoadedSource {
        entity,
        table: table.to_string(),
        rows,
    })
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
