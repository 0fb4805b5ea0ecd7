//! Where the read endpoint gets its connections

use crate::error::ApiError;
use kf_core::DatabaseConfig;
use kf_db::{Database, DbResult, DuckDbBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Connection source for the read endpoint
#[derive(Clone)]
pub enum Store {
    /// One connection shared by every request
    Shared(Arc<dyn Database>),
    /// A DuckDB file opened read-only for each request and closed after it.
    ///
    /// Between requests the endpoint holds nothing open, so a pipeline run
    /// can take the file for writing.
    ReadOnlyFile(PathBuf),
}

impl Store {
    /// Store for the configured database.
    ///
    /// An in-memory database exists only inside this process, so it gets a
    /// fresh shared connection.
    pub fn for_database(config: &DatabaseConfig) -> DbResult<Self> {
        if config.is_in_memory() {
            Ok(Store::Shared(Arc::new(DuckDbBackend::in_memory()?)))
        } else {
            Ok(Store::ReadOnlyFile(PathBuf::from(&config.path)))
        }
    }

    /// Connection for one request, or `None` while the file does not exist
    pub async fn open(&self) -> Result<Option<Arc<dyn Database>>, ApiError> {
        let path = match self {
            Store::Shared(db) => return Ok(Some(Arc::clone(db))),
            Store::ReadOnlyFile(path) if !path.exists() => return Ok(None),
            Store::ReadOnlyFile(path) => path.clone(),
        };

        let db = tokio::task::spawn_blocking(move || DuckDbBackend::open_read_only(&path))
            .await
            .map_err(|e| ApiError::Internal(format!("connect task failed: {e}")))?
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Some(Arc::new(db)))
    }
}
