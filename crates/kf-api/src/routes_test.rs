use super::*;
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kf_db::{CsvLoadOptions, DbResult, DuckDbBackend};
use std::sync::Arc;
use tempfile::tempdir;
use serde_json::{json, Value};

async fn seeded() -> Arc<dyn Database> {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE courses (course_id BIGINT, course_name VARCHAR, duration_hours DOUBLE);
         INSERT INTO courses VALUES (100, 'Rust Basics', 12.5), (101, 'SQL', NULL);
         CREATE TABLE engagements (session_id BIGINT, day DATE);
         INSERT INTO engagements VALUES (1, DATE '2024-03-15');",
    )
    .await
    .unwrap();
    Arc::new(db)
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_existing_table_returns_one_record_per_row() {
    let db = seeded().await;

    let response = get_table(State(Store::Shared(db)), Path("courses".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let mut body = body_json(response).await;
    let rows = body.as_array_mut().unwrap();
    rows.sort_by_key(|r| r["course_id"].as_i64());
    assert_eq!(
        *rows,
        vec![
            json!({"course_id": 100, "course_name": "Rust Basics", "duration_hours": 12.5}),
            json!({"course_id": 101, "course_name": "SQL", "duration_hours": null}),
        ]
    );
}

#[tokio::test]
async fn test_missing_table_is_404() {
    let db = seeded().await;

    let response = get_table(State(Store::Shared(db)), Path("no_such_table".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Table 'no_such_table' not found"})
    );
}

#[tokio::test]
async fn test_invalid_name_is_404() {
    let db = seeded().await;

    let err = fetch_table(db.as_ref(), "courses; DROP TABLE courses")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(db.relation_exists("courses").await.unwrap());
}

#[tokio::test]
async fn test_store_failure_is_500_with_message() {
    let db: Arc<dyn Database> = Arc::new(Broken);

    let response = get_table(State(Store::Shared(db)), Path("courses".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("disk I/O error"));
}

#[tokio::test]
async fn test_engagements_shortcut() {
    let db = seeded().await;

    let response = get_engagements(State(Store::Shared(db))).await.into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([{"session_id": 1, "day": "2024-03-15"}])
    );
}

#[tokio::test]
async fn test_index_welcome() {
    assert_eq!(index().await, "Welcome to the Training KPI API!");
}

fn io_failure() -> DbError {
    DbError::ExecutionError("disk I/O error".to_string())
}

#[tokio::test]
async fn test_read_only_file_serves_committed_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("warehouse.duckdb");
    {
        let writer = DuckDbBackend::from_path(&path).unwrap();
        writer
            .execute_batch(
                "CREATE TABLE engagements (session_id BIGINT);
                 INSERT INTO engagements VALUES (7);",
            )
            .await
            .unwrap();
    }
    let store = Store::ReadOnlyFile(path.clone());

    let response = get_engagements(State(store.clone())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([{"session_id": 7}]));

    // Nothing stays open after the request, so a writer can publish again.
    let writer = DuckDbBackend::from_path(&path).unwrap();
    writer
        .execute("INSERT INTO engagements VALUES (8)")
        .await
        .unwrap();
    drop(writer);

    let response = get_engagements(State(store)).await.into_response();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_store_file_not_created_yet_is_404() {
    let dir = tempdir().unwrap();
    let store = Store::ReadOnlyFile(dir.path().join("warehouse.duckdb"));

    let response = get_table(State(store), Path("fact_training_kpis".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!dir.path().join("warehouse.duckdb").exists());
}

#[test]
fn test_in_memory_config_shares_one_connection() {
    let config = kf_core::DatabaseConfig {
        path: ":memory:".to_string(),
    };
    assert!(matches!(
        Store::for_database(&config).unwrap(),
        Store::Shared(_)
    ));
}

/// Store where the table exists but every read fails
struct Broken;

#[async_trait]
impl Database for Broken {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
    async fn execute(&self, _: &str) -> DbResult<usize> {
        Err(io_failure())
    }
    async fn execute_batch(&self, _: &str) -> DbResult<()> {
        Err(io_failure())
    }
    async fn create_table_as(&self, _: &str, _: &str, _: bool) -> DbResult<()> {
        Err(io_failure())
    }
    async fn relation_exists(&self, _: &str) -> DbResult<bool> {
        Ok(true)
    }
    async fn query_count(&self, _: &str) -> DbResult<usize> {
        Err(io_failure())
    }
    async fn load_csv(&self, _: &str, _: &str, _: &CsvLoadOptions) -> DbResult<()> {
        Err(io_failure())
    }
    async fn csv_header(&self, _: &str) -> DbResult<Vec<String>> {
        Err(io_failure())
    }
    async fn query_records(&self, _: &str) -> DbResult<Vec<Record>> {
        Err(io_failure())
    }
    async fn drop_if_exists(&self, _: &str) -> DbResult<()> {
        Err(io_failure())
    }
    async fn swap_table(&self, _: &str, _: &str) -> DbResult<()> {
        Err(io_failure())
    }
    fn db_type(&self) -> &'static str {
        "broken"
    }
}
