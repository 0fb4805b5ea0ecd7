//! Conversion of result rows into flat JSON records.
//!
//! DuckDB returns `None` for `Option<String>` on non-text columns, so reading
//! an arbitrary row requires knowing each column's type. Queries are described
//! first; integer, floating point and boolean columns are read natively and
//! every other type is cast to VARCHAR in SQL before it reaches Rust.

use kf_core::sql_utils::quote_ident;
use serde_json::{Map, Number, Value};

/// One flat record: column name to JSON value
pub type Record = Map<String, Value>;

/// A result column as reported by `DESCRIBE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// How a column's values are read out of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ValueKind {
    pub(crate) fn of(data_type: &str) -> Self {
        let upper = data_type.to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" => ValueKind::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" => ValueKind::Integer,
            "FLOAT" | "DOUBLE" | "REAL" => ValueKind::Float,
            "VARCHAR" => ValueKind::Text,
            _ if upper.starts_with("DECIMAL") => ValueKind::Float,
            _ => ValueKind::Text,
        }
    }
}

impl ColumnInfo {
    pub(crate) fn kind(&self) -> ValueKind {
        ValueKind::of(&self.data_type)
    }

    /// Select-list expression that yields a natively readable value
    pub(crate) fn projection(&self) -> String {
        let ident = quote_ident(&self.name);
        let upper = self.data_type.to_ascii_uppercase();
        match self.kind() {
            ValueKind::Float if upper.starts_with("DECIMAL") => {
                format!("CAST({ident} AS DOUBLE) AS {ident}")
            }
            ValueKind::Text if upper != "VARCHAR" => {
                format!("CAST({ident} AS VARCHAR) AS {ident}")
            }
            _ => ident,
        }
    }
}

/// Read column `idx` of `row` as a JSON value
pub(crate) fn read_value(
    row: &duckdb::Row<'_>,
    idx: usize,
    kind: ValueKind,
) -> duckdb::Result<Value> {
    let value = match kind {
        ValueKind::Boolean => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        ValueKind::Integer => row.get::<_, Option<i64>>(idx)?.map(Value::from),
        ValueKind::Float => row
            .get::<_, Option<f64>>(idx)?
            .map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number)),
        ValueKind::Text => row.get::<_, Option<String>>(idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}
