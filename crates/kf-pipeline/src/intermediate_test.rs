use super::*;
use kf_db::DuckDbBackend;
use serde_json::json;

const RAW_TABLES: &str = "
CREATE TABLE participants (
    participant_id BIGINT, first_name VARCHAR, last_name VARCHAR,
    department VARCHAR, start_date_at_company DATE);
CREATE TABLE enrollments (
    enrollment_id BIGINT, participant_id BIGINT, course_id BIGINT,
    enrollment_date DATE, completion_date DATE, score DOUBLE, status VARCHAR);
";

/// Column names and types of a table, in declaration order
async fn columns_of(db: &DuckDbBackend, table: &str) -> Vec<(String, String)> {
    db.query_records(&format!(
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_name = '{table}' ORDER BY ordinal_position"
    ))
    .await
    .unwrap()
    .into_iter()
    .map(|row| {
        (
            row["column_name"].as_str().unwrap().to_string(),
            row["data_type"].as_str().unwrap().to_string(),
        )
    })
    .collect()
}

async fn seeded() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(RAW_TABLES).await.unwrap();
    db.execute_batch(
        "INSERT INTO participants VALUES (1, 'Ada', 'Lovelace', 'Engineering', DATE '2020-01-06');
         INSERT INTO enrollments VALUES
            (10, 1, 100, DATE '2024-03-15', DATE '2024-04-02', 91.0, 'completed'),
            (11, 99, 100, DATE '2024-04-01', NULL, NULL, 'pending');",
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn test_unmatched_enrollment_is_dropped() {
    let db = seeded().await;

    let outcome = build_intermediate(&db).await.unwrap();
    assert_eq!(outcome.stage, Stage::Intermediate);
    assert_eq!(outcome.rows, 1);

    let records = db
        .query_records("SELECT * FROM transformed_enrollments_participants")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    let row = &records[0];
    assert_eq!(row["enrollment_id"], json!(10));
    assert_eq!(row["first_name"], json!("Ada"));
    assert_eq!(row["participant_start_date"], json!("2020-01-06"));
    assert_eq!(row["is_completed"], json!(true));
    assert_eq!(row["enrollment_year"], json!(2024));
    assert_eq!(row["enrollment_month"], json!(3));
}

#[tokio::test]
async fn test_column_order() {
    let db = seeded().await;
    build_intermediate(&db).await.unwrap();

    let columns = columns_of(&db, "transformed_enrollments_participants").await;
    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        [
            "enrollment_id",
            "participant_id",
            "first_name",
            "last_name",
            "department",
            "participant_start_date",
            "course_id",
            "enrollment_date",
            "completion_date",
            "score",
            "enrollment_status",
            "is_completed",
            "enrollment_year",
            "enrollment_month",
        ]
    );
}

#[tokio::test]
async fn test_status_match_is_case_sensitive() {
    let db = seeded().await;
    db.execute_batch(
        "INSERT INTO enrollments VALUES
            (12, 1, 100, DATE '2024-05-01', NULL, NULL, 'Completed'),
            (13, 1, 100, DATE '2024-05-02', NULL, NULL, 'in_progress');",
    )
    .await
    .unwrap();

    build_intermediate(&db).await.unwrap();

    let records = db
        .query_records(
            "SELECT enrollment_id, is_completed FROM transformed_enrollments_participants \
             ORDER BY enrollment_id",
        )
        .await
        .unwrap();
    let flags: Vec<_> = records.iter().map(|r| r["is_completed"].clone()).collect();
    assert_eq!(flags, vec![json!(true), json!(false), json!(false)]);
}

#[tokio::test]
async fn test_rebuild_is_a_full_snapshot() {
    let db = seeded().await;
    build_intermediate(&db).await.unwrap();
    let first = db
        .query_records("SELECT * FROM transformed_enrollments_participants")
        .await
        .unwrap();

    let outcome = build_intermediate(&db).await.unwrap();
    let second = db
        .query_records("SELECT * FROM transformed_enrollments_participants")
        .await
        .unwrap();

    assert_eq!(outcome.rows, 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_participants_is_upstream_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE enrollments (enrollment_id BIGINT, participant_id BIGINT, \
         course_id BIGINT, enrollment_date DATE, completion_date DATE, score DOUBLE, status VARCHAR)",
    )
    .await
    .unwrap();

    let err = build_intermediate(&db).await.unwrap_err();

    match &err {
        PipelineError::UpstreamMissing { stage, table } => {
            assert_eq!(*stage, Stage::Intermediate);
            assert_eq!(table, "participants");
        }
        other => panic!("expected UpstreamMissing, got {other:?}"),
    }
    assert_eq!(err.stage(), Some(Stage::Intermediate));
    assert!(!db
        .relation_exists("transformed_enrollments_participants")
        .await
        .unwrap());
}
