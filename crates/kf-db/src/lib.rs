//! kf-db - Database abstraction layer for kpiflow
//!
//! This crate provides the `Database` trait and its DuckDB implementation,
//! including the atomic table swap used to publish rebuilt tables and the
//! conversion of result rows into flat JSON records.

pub mod duckdb;
pub mod error;
pub mod records;
pub mod traits;

pub use self::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use records::Record;
pub use traits::{CsvLoadOptions, Database};
