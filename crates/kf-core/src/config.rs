//! Configuration types and parsing for kpiflow.yml

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Path value that selects an in-memory DuckDB database
pub const IN_MEMORY: &str = ":memory:";

/// Main project configuration from kpiflow.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Store connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Raw CSV sources to ingest
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Transformation settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Read endpoint settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// Whether the store lives only in memory (no lock file, no persistence)
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }
}

fn default_db_path() -> String {
    "warehouse.duckdb".to_string()
}

/// One CSV file feeding one raw entity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceFile {
    /// Entity (and therefore raw table) the file populates
    pub entity: Entity,

    /// File name relative to `data_dir`
    pub file: String,
}

/// Raw source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Directory holding the raw CSV files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Files to load; defaults to one `<entity>.csv` per entity
    #[serde(default = "default_source_files")]
    pub files: Vec<SourceFile>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            files: default_source_files(),
        }
    }
}

impl SourcesConfig {
    /// Absolute (or data_dir-relative) location of a source file
    pub fn path_of(&self, source: &SourceFile) -> PathBuf {
        self.data_dir.join(&source.file)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data").join("raw")
}

fn default_source_files() -> Vec<SourceFile> {
    Entity::ALL
        .iter()
        .map(|&entity| SourceFile {
            entity,
            file: entity.default_file(),
        })
        .collect()
}

/// How stage 2 treats enrollments with more than one feedback row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackPolicy {
    /// One fact row per feedback row
    #[default]
    FanOut,
    /// Only the most recently ingested feedback row per enrollment
    Latest,
}

impl std::fmt::Display for FeedbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackPolicy::FanOut => write!(f, "fan_out"),
            FeedbackPolicy::Latest => write!(f, "latest"),
        }
    }
}

/// Transformation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Feedback aggregation policy for the fact table
    #[serde(default)]
    pub feedback_policy: FeedbackPolicy,

    /// Upper bound for connecting and for each stage, in seconds
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feedback_policy: FeedbackPolicy::default(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

fn default_stage_timeout_secs() -> u64 {
    300
}

/// Read endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Create a configuration with every section at its default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: DatabaseConfig::default(),
            sources: SourcesConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Load configuration from a file path.
    ///
    /// Relative `database.path` and `sources.data_dir` values are resolved
    /// against the directory containing the file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(root) = path.parent() {
            config.resolve_paths(root);
        }
        log::debug!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve relative paths against a root directory
    pub fn resolve_paths(&mut self, root: &Path) {
        if self.sources.data_dir.is_relative() {
            self.sources.data_dir = root.join(&self.sources.data_dir);
        }
        if !self.database.is_in_memory() && Path::new(&self.database.path).is_relative() {
            self.database.path = root.join(&self.database.path).display().to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.database.path.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.pipeline.stage_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "pipeline.stage_timeout_secs must be greater than zero".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for source in &self.sources.files {
            if !seen.insert(source.entity) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "Entity '{}' is listed more than once in sources.files",
                        source.entity
                    ),
                });
            }
            if source.file.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Source file for entity '{}' is empty", source.entity),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
