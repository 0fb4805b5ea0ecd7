//! Routes of the read endpoint

use crate::error::ApiError;
use crate::store::Store;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use kf_core::{Entity, TableName};
use kf_db::{Database, DbError, Record};

/// Plain-text body of `GET /`
pub const WELCOME: &str = "Welcome to the Training KPI API!";

/// Build the endpoint's router over `store`.
///
/// - `GET /` returns [`WELCOME`]
/// - `GET /api/tables/{name}` returns every row of `name`
/// - `GET /api/engagements` is shorthand for the engagements table
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/tables/{name}", get(get_table))
        .route("/api/engagements", get(get_engagements))
        .with_state(store)
}

async fn index() -> &'static str {
    WELCOME
}

/// GET /api/tables/{name}
async fn get_table(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
    read_table(&store, &name).await.map(Json)
}

/// GET /api/engagements
async fn get_engagements(State(store): State<Store>) -> Result<Json<Vec<Record>>, ApiError> {
    read_table(&store, Entity::Engagements.table_name())
        .await
        .map(Json)
}

/// Open a connection for this request and read `name` through it.
///
/// A store file that does not exist yet holds no tables.
async fn read_table(store: &Store, name: &str) -> Result<Vec<Record>, ApiError> {
    match store.open().await? {
        Some(db) => fetch_table(db.as_ref(), name).await,
        None => Err(ApiError::NotFound(name.to_string())),
    }
}

/// Read every row of `name` as a flat record.
///
/// Names that are not plain identifiers can never name a table, so they are
/// reported as not found without touching the store.
pub async fn fetch_table(db: &dyn Database, name: &str) -> Result<Vec<Record>, ApiError> {
    let table = TableName::try_new(name).ok_or_else(|| ApiError::NotFound(name.to_string()))?;

    let exists = db
        .relation_exists(table.as_str())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !exists {
        return Err(ApiError::NotFound(name.to_string()));
    }

    let records = db
        .query_records(&format!("SELECT * FROM {}", table.quoted()))
        .await
        .map_err(|e| match e {
            // Dropped between the existence check and the read.
            DbError::TableNotFound(_) => ApiError::NotFound(name.to_string()),
            other => ApiError::Internal(other.to_string()),
        })?;

    log::debug!("Served {} rows from {}", records.len(), table);
    Ok(records)
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
