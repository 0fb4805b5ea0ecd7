//! Database trait definition

use crate::error::DbResult;
use crate::records::Record;
use async_trait::async_trait;
use kf_core::ColumnDef;

/// How a CSV file is mapped onto a table
#[derive(Debug, Clone, Default)]
pub struct CsvLoadOptions {
    /// Declared columns to keep and cast. Empty means infer every column.
    pub columns: Vec<ColumnDef>,
}

impl CsvLoadOptions {
    /// Keep all CSV columns with inferred types
    pub fn inferred() -> Self {
        Self::default()
    }

    /// Keep only `columns`, cast to their declared types
    pub fn typed(columns: &[ColumnDef]) -> Self {
        Self {
            columns: columns.to_vec(),
        }
    }
}

/// Database abstraction trait for kpiflow
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> DbResult<()>;

    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Create table from SELECT statement
    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Count the rows a query returns
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Replace `table` with the full content of a CSV file
    async fn load_csv(&self, table: &str, path: &str, options: &CsvLoadOptions) -> DbResult<()>;

    /// Column names of a CSV file's header, without loading it
    async fn csv_header(&self, path: &str) -> DbResult<Vec<String>>;

    /// Run a query and return every row as a flat record
    async fn query_records(&self, sql: &str) -> DbResult<Vec<Record>>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Replace `target` with `staging` in a single transaction.
    ///
    /// On failure the transaction is rolled back and `target` keeps its
    /// previous content.
    async fn swap_table(&self, staging: &str, target: &str) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
