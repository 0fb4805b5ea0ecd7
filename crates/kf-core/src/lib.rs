//! kf-core - Core library for kpiflow
//!
//! This crate provides the configuration model, the typed schemas of the raw
//! and derived tables, SQL identifier helpers, and the pipeline run state
//! machine shared by every other kpiflow crate.

pub mod config;
pub mod entity;
pub mod error;
pub mod run_state;
pub mod sql_utils;
pub mod table_name;

pub use config::{Config, DatabaseConfig, FeedbackPolicy, PipelineConfig, ServerConfig};
pub use config::{SourceFile, SourcesConfig};
pub use entity::{ColumnDef, Entity, SqlType, FACT_TABLE, INTERMEDIATE_TABLE};
pub use error::{CoreError, CoreResult};
pub use run_state::{PipelineState, RunState, Transition};
pub use table_name::TableName;
