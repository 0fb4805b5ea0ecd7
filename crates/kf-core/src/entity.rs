//! Typed schemas for the raw source tables and the derived tables.
//!
//! Every raw entity except engagements carries an explicit column list. The
//! loader checks a CSV header against it and casts each column to the
//! declared type instead of trusting type inference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table rebuilt by stage 1 (enrollments joined to participants).
pub const INTERMEDIATE_TABLE: &str = "transformed_enrollments_participants";

/// Table rebuilt by stage 2 (the denormalized KPI fact table).
pub const FACT_TABLE: &str = "fact_training_kpis";

/// SQL column types used by the typed raw schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Double,
    Varchar,
    Date,
}

impl SqlType {
    /// DuckDB type name
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Varchar => "VARCHAR",
            SqlType::Date => "DATE",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A declared column of a raw entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
}

const fn col(name: &'static str, sql_type: SqlType) -> ColumnDef {
    ColumnDef { name, sql_type }
}

const PARTICIPANT_COLUMNS: &[ColumnDef] = &[
    col("participant_id", SqlType::BigInt),
    col("first_name", SqlType::Varchar),
    col("last_name", SqlType::Varchar),
    col("department", SqlType::Varchar),
    col("start_date_at_company", SqlType::Date),
];

const COURSE_COLUMNS: &[ColumnDef] = &[
    col("course_id", SqlType::BigInt),
    col("course_name", SqlType::Varchar),
    col("category", SqlType::Varchar),
    col("duration_hours", SqlType::Double),
];

const ENROLLMENT_COLUMNS: &[ColumnDef] = &[
    col("enrollment_id", SqlType::BigInt),
    col("participant_id", SqlType::BigInt),
    col("course_id", SqlType::BigInt),
    col("enrollment_date", SqlType::Date),
    col("completion_date", SqlType::Date),
    col("score", SqlType::Double),
    col("status", SqlType::Varchar),
];

const FEEDBACK_COLUMNS: &[ColumnDef] = &[
    col("enrollment_id", SqlType::BigInt),
    col("rating", SqlType::Double),
    col("comments", SqlType::Varchar),
];

/// A raw source entity, each landing in its own table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Participants,
    Courses,
    Enrollments,
    Feedbacks,
    Engagements,
}

impl Entity {
    /// All entities in default load order
    pub const ALL: [Entity; 5] = [
        Entity::Participants,
        Entity::Courses,
        Entity::Enrollments,
        Entity::Feedbacks,
        Entity::Engagements,
    ];

    /// Raw table the entity is loaded into
    pub fn table_name(self) -> &'static str {
        match self {
            Entity::Participants => "participants",
            Entity::Courses => "courses",
            Entity::Enrollments => "enrollments",
            Entity::Feedbacks => "feedbacks",
            Entity::Engagements => "engagements",
        }
    }

    /// CSV file name used when the config does not list sources explicitly
    pub fn default_file(self) -> String {
        format!("{}.csv", self.table_name())
    }

    /// Declared columns, or `None` for pass-through entities whose schema is inferred
    pub fn columns(self) -> Option<&'static [ColumnDef]> {
        match self {
            Entity::Participants => Some(PARTICIPANT_COLUMNS),
            Entity::Courses => Some(COURSE_COLUMNS),
            Entity::Enrollments => Some(ENROLLMENT_COLUMNS),
            Entity::Feedbacks => Some(FEEDBACK_COLUMNS),
            Entity::Engagements => None,
        }
    }

    /// Declared columns absent from `header`, in declaration order.
    ///
    /// Pass-through entities never report missing columns.
    pub fn missing_columns<S: AsRef<str>>(self, header: &[S]) -> Vec<&'static str> {
        let Some(columns) = self.columns() else {
            return Vec::new();
        };
        columns
            .iter()
            .filter(|c| !header.iter().any(|h| h.as_ref() == c.name))
            .map(|c| c.name)
            .collect()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
#[path = "entity_test.rs"]
mod tests;
