//! Integration tests for the kpiflow binary

use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

const SAMPLE_CONFIG: &str = "tests/fixtures/sample_project/kpiflow.yml";

/// Path to the compiled kpiflow binary
fn kpiflow_bin() -> String {
    env!("CARGO_BIN_EXE_kpiflow").to_string()
}

/// Run `kpiflow` and return (stdout, stderr, exit code).
fn run_kpiflow(args: &[&str]) -> (String, String, Option<i32>) {
    let output = Command::new(kpiflow_bin())
        .args(args)
        .env_remove("KPIFLOW_DATABASE")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute kpiflow with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code(),
    )
}

#[test]
fn test_run_sample_project() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("warehouse.duckdb").display().to_string();

    let (stdout, stderr, code) = run_kpiflow(&[
        "--config",
        SAMPLE_CONFIG,
        "--database",
        &db,
        "run",
        "--json",
    ]);

    assert_eq!(code, Some(0), "stderr: {stderr}");
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["state"], "stage2_built");
    let stages = summary["stages"].as_array().unwrap();
    // Enrollment 11 has no participant; enrollment 10 has two feedback rows.
    assert_eq!(stages[0]["rows"], 4);
    assert_eq!(stages[1]["rows"], 5);
}

#[test]
fn test_run_ignores_lock_file_left_by_crashed_run() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("warehouse.duckdb").display().to_string();
    fs::write(format!("{db}.lock"), "pid=999999 run_id=crashed\n").unwrap();

    let (_, stderr, code) = run_kpiflow(&["--config", SAMPLE_CONFIG, "--database", &db, "run"]);

    assert_eq!(code, Some(0), "stderr: {stderr}");
}

/// A `kpiflow serve` process, killed when dropped
struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Raw HTTP/1.1 GET; `None` until the server accepts connections
fn http_get(port: u16, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).ok()?;
    Some(response)
}

fn serve(db: &str, port: u16) -> Server {
    let child = Command::new(kpiflow_bin())
        .args(["--config", SAMPLE_CONFIG, "--database", db, "serve"])
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .env_remove("KPIFLOW_DATABASE")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let server = Server(child);
    for _ in 0..100 {
        if http_get(port, "/").is_some() {
            return server;
        }
        sleep(Duration::from_millis(100));
    }
    panic!("kpiflow serve did not start on port {port}");
}

#[test]
fn test_transform_succeeds_while_serving() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("warehouse.duckdb").display().to_string();
    let (_, stderr, code) = run_kpiflow(&["--config", SAMPLE_CONFIG, "--database", &db, "run"]);
    assert_eq!(code, Some(0), "stderr: {stderr}");

    let port = free_port();
    let _server = serve(&db, port);
    let before = http_get(port, "/api/tables/fact_training_kpis").unwrap();
    assert!(before.starts_with("HTTP/1.1 200"), "response: {before}");

    let (_, stderr, code) =
        run_kpiflow(&["--config", SAMPLE_CONFIG, "--database", &db, "transform"]);
    assert_eq!(code, Some(0), "stderr: {stderr}");

    let after = http_get(port, "/api/tables/fact_training_kpis").unwrap();
    assert!(after.starts_with("HTTP/1.1 200"), "response: {after}");
    assert!(after.contains("enrollment_id"), "response: {after}");
}

#[test]
fn test_transform_before_ingest_fails() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("warehouse.duckdb").display().to_string();

    let (_, stderr, code) = run_kpiflow(&["-c", SAMPLE_CONFIG, "--database", &db, "transform"]);

    assert_eq!(code, Some(1));
    assert!(stderr.contains("P005"), "stderr: {stderr}");
}

#[test]
fn test_ingest_with_missing_sources_exits_4() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("warehouse.duckdb").display().to_string();
    let empty = dir.path().join("empty");
    fs::create_dir_all(&empty).unwrap();

    let (stdout, _, code) = run_kpiflow(&[
        "-c",
        SAMPLE_CONFIG,
        "--database",
        &db,
        "--data-dir",
        &empty.display().to_string(),
        "ingest",
    ]);

    assert_eq!(code, Some(4));
    assert!(stdout.contains("Ingested 0 of 5 sources"), "stdout: {stdout}");
}

#[test]
fn test_missing_config_file_fails() {
    let (_, stderr, code) = run_kpiflow(&["-c", "does/not/exist.yml", "ingest"]);

    assert_eq!(code, Some(1));
    assert!(stderr.contains("E001"), "stderr: {stderr}");
}
