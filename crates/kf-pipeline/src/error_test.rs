use super::*;
use kf_db::{Database, DuckDbBackend};
use std::error::Error as _;

async fn execution_error() -> DbError {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("SELECT * FROM no_such_table").await.unwrap_err()
}

#[tokio::test]
async fn test_wrapped_error_appears_once_in_report() {
    let source = execution_error().await;
    let db_message = source.to_string();
    let err = PipelineError::QueryExecution {
        stage: Stage::Fact,
        source,
    };

    assert!(!err.to_string().contains(&db_message));
    assert_eq!(err.source().unwrap().to_string(), db_message);

    let report = err.report();
    assert!(report.starts_with("[P006]"));
    assert_eq!(report.matches(&db_message).count(), 1);
}

#[test]
fn test_report_follows_io_source() {
    let err = PipelineError::LockIo {
        path: "/data/warehouse.duckdb.lock".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
    };

    assert_eq!(
        err.report(),
        "[P009] Failed to create run lock at /data/warehouse.duckdb.lock: permission denied"
    );
}

#[test]
fn test_report_without_source_is_message() {
    let err = PipelineError::Timeout {
        step: "ingest".to_string(),
        secs: 5,
    };
    assert_eq!(err.report(), err.to_string());
}
