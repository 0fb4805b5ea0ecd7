//! Error types for kf-pipeline

use crate::stage::Stage;
use kf_core::{CoreError, Entity};
use kf_db::DbError;
use thiserror::Error;

/// Pipeline errors
///
/// A variant wrapping another error leaves it out of its own message and
/// exposes it through `source()`; use [`PipelineError::report`] for the full
/// chain on one line.
///
/// Ingestion errors (`SourceNotFound`, `SchemaMismatch`, `Load`) are reported
/// per source and never stop the other sources. Every other variant ends the
/// run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// P001: The store could not be reached
    #[error("[P001] Store connection failed")]
    Connection(#[source] DbError),

    /// P002: A configured source file does not exist
    #[error("[P002] Source file for '{entity}' not found: {path}")]
    SourceNotFound { entity: Entity, path: String },

    /// P003: A source file lacks declared columns
    #[error("[P003] Source '{entity}' is missing required columns: {missing}")]
    SchemaMismatch { entity: Entity, missing: String },

    /// P004: A source file could not be loaded
    #[error("[P004] Failed to load source '{entity}'")]
    Load { entity: Entity, source: DbError },

    /// P005: A stage's input table is absent
    #[error("[P005] {stage} requires table '{table}', which does not exist")]
    UpstreamMissing { stage: Stage, table: String },

    /// P006: A stage's statements failed
    #[error("[P006] {stage} failed")]
    QueryExecution { stage: Stage, source: DbError },

    /// P007: A step did not finish within the configured bound
    #[error("[P007] {step} timed out after {secs}s")]
    Timeout { step: String, secs: u64 },

    /// P008: Another run holds the store
    #[error("[P008] Another pipeline run holds the lock at {path}")]
    Locked { path: String },

    /// P009: The lock file could not be created
    #[error("[P009] Failed to create run lock at {path}")]
    LockIo {
        path: String,
        source: std::io::Error,
    },

    /// Run state machine error
    #[error(transparent)]
    State(#[from] CoreError),
}

impl PipelineError {
    /// The stage this error belongs to, if it came from a stage
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::UpstreamMissing { stage, .. }
            | PipelineError::QueryExecution { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// This error and its sources, joined with `": "`
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
