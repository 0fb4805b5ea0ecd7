//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::records::{read_value, ColumnInfo, Record, ValueKind};
use crate::traits::{CsvLoadOptions, Database};
use async_trait::async_trait;
use duckdb::{params, AccessMode, Config, Connection};
use kf_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified, split_qualified_name};
use kf_core::{ColumnDef, SqlType};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// DuckDB database backend
///
/// Every call runs on Tokio's blocking pool so callers can put a timeout on
/// it. The single connection is guarded by a mutex, which serializes
/// statements.
pub struct DuckDbBackend {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::wrap(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::wrap(conn))
    }

    /// Open an existing DuckDB file without write access.
    ///
    /// Read-only connections from several processes can coexist, but a
    /// writer still needs the file to itself while one is open.
    pub fn open_read_only(path: &Path) -> DbResult<Self> {
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let conn = Connection::open_with_flags(path, config)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::wrap(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == kf_core::config::IN_MEMORY {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool
    async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| DbError::Internal(format!("blocking task failed: {e}")))?
    }
}

/// Classify a DuckDB error, attaching the statement to execution failures
fn classify(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{}: {}", msg, sql)),
        other => other,
    }
}

fn execute_sync(conn: &Connection, sql: &str) -> DbResult<usize> {
    conn.execute(sql, []).map_err(|e| classify(e, sql))
}

fn execute_batch_sync(conn: &Connection, sql: &str) -> DbResult<()> {
    conn.execute_batch(sql).map_err(|e| classify(e, sql))
}

fn query_count_sync(conn: &Connection, sql: &str) -> DbResult<usize> {
    let count_sql = format!("SELECT COUNT(*) FROM ({}) AS q", sql);
    let count: i64 = conn
        .query_row(&count_sql, [], |row| row.get(0))
        .map_err(|e| classify(e, &count_sql))?;
    Ok(count as usize)
}

fn relation_exists_sync(conn: &Connection, name: &str) -> DbResult<bool> {
    let (schema, table) = split_qualified_name(name);
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
            params![schema, table],
            |row| row.get(0),
        )
        .map_err(DbError::from)?;
    Ok(count > 0)
}

fn describe_sync(conn: &Connection, sql: &str) -> DbResult<Vec<ColumnInfo>> {
    let describe = format!("DESCRIBE {}", sql);
    let mut stmt = conn.prepare(&describe).map_err(|e| classify(e, &describe))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                data_type: row.get(1)?,
            })
        })
        .map_err(|e| classify(e, &describe))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn query_records_sync(conn: &Connection, sql: &str) -> DbResult<Vec<Record>> {
    let columns = describe_sync(conn, sql)?;
    let kinds: Vec<ValueKind> = columns.iter().map(ColumnInfo::kind).collect();
    let select_list = columns
        .iter()
        .map(ColumnInfo::projection)
        .collect::<Vec<_>>()
        .join(", ");
    let wrapped = format!("SELECT {} FROM ({}) AS q", select_list, sql);

    let mut stmt = conn.prepare(&wrapped).map_err(|e| classify(e, &wrapped))?;
    let records = stmt
        .query_map([], |row| {
            let mut record = Record::new();
            for (idx, (column, kind)) in columns.iter().zip(&kinds).enumerate() {
                record.insert(column.name.clone(), read_value(row, idx, *kind)?);
            }
            Ok(record)
        })
        .map_err(|e| classify(e, &wrapped))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn swap_table_sync(conn: &Connection, staging: &str, target: &str) -> DbResult<()> {
    let (_, target_table) = split_qualified_name(target);
    let swap = format!(
        "DROP TABLE IF EXISTS {}; ALTER TABLE {} RENAME TO {};",
        quote_qualified(target),
        quote_qualified(staging),
        quote_ident(target_table)
    );

    execute_batch_sync(conn, "BEGIN TRANSACTION")?;
    match conn.execute_batch(&swap) {
        Ok(()) => execute_batch_sync(conn, "COMMIT"),
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::warn!("Rollback after failed swap of {} failed: {}", target, rollback);
            }
            Err(classify(e, &swap))
        }
    }
}

/// Select-list expression casting one declared CSV column
fn cast_expression(column: &ColumnDef) -> String {
    let ident = quote_ident(column.name);
    match column.sql_type {
        // Accept both `2024-03-15` and `2024-03-15 09:30:00`.
        SqlType::Date => format!("CAST(CAST({ident} AS TIMESTAMP) AS DATE) AS {ident}"),
        other => format!("CAST({ident} AS {other}) AS {ident}"),
    }
}

/// SELECT reading a CSV file according to `options`
fn csv_select(path: &str, options: &CsvLoadOptions) -> String {
    let literal = escape_sql_string(path);
    if options.columns.is_empty() {
        format!("SELECT * FROM read_csv_auto('{}')", literal)
    } else {
        let select_list = options
            .columns
            .iter()
            .map(cast_expression)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} FROM read_csv('{}', header = true, all_varchar = true)",
            select_list, literal
        )
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn ping(&self) -> DbResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                .map(|_| ())
                .map_err(|e| DbError::ConnectionError(e.to_string()))
        })
        .await
    }

    async fn execute(&self, sql: &str) -> DbResult<usize> {
        let sql = sql.to_string();
        self.run(move |conn| execute_sync(conn, &sql)).await
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let sql = sql.to_string();
        self.run(move |conn| execute_batch_sync(conn, &sql)).await
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let sql = if replace {
            format!("CREATE OR REPLACE TABLE {} AS {}", quote_qualified(name), select)
        } else {
            format!("CREATE TABLE {} AS {}", quote_qualified(name), select)
        };
        self.run(move |conn| execute_sync(conn, &sql).map(|_| ()))
            .await
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let name = name.to_string();
        self.run(move |conn| relation_exists_sync(conn, &name)).await
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        let sql = sql.to_string();
        self.run(move |conn| query_count_sync(conn, &sql)).await
    }

    async fn load_csv(&self, table: &str, path: &str, options: &CsvLoadOptions) -> DbResult<()> {
        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS {}",
            quote_qualified(table),
            csv_select(path, options)
        );
        self.run(move |conn| execute_sync(conn, &sql).map(|_| ()))
            .await
    }

    async fn csv_header(&self, path: &str) -> DbResult<Vec<String>> {
        let sql = format!(
            "SELECT * FROM read_csv('{}', header = true, all_varchar = true)",
            escape_sql_string(path)
        );
        let columns = self.run(move |conn| describe_sync(conn, &sql)).await?;
        Ok(columns.into_iter().map(|c| c.name).collect())
    }

    async fn query_records(&self, sql: &str) -> DbResult<Vec<Record>> {
        let sql = sql.to_string();
        self.run(move |conn| query_records_sync(conn, &sql)).await
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        let quoted = quote_qualified(name);
        self.run(move |conn| {
            // DROP VIEW on a table (and vice versa) is an error in DuckDB, so
            // try both and ignore the mismatch.
            let _ = execute_sync(conn, &format!("DROP VIEW IF EXISTS {}", quoted));
            let _ = execute_sync(conn, &format!("DROP TABLE IF EXISTS {}", quoted));
            Ok(())
        })
        .await
    }

    async fn swap_table(&self, staging: &str, target: &str) -> DbResult<()> {
        let staging = staging.to_string();
        let target = target.to_string();
        self.run(move |conn| swap_table_sync(conn, &staging, &target))
            .await
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
