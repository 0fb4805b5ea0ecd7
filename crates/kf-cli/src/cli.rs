//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use kf_core::FeedbackPolicy;

/// kpiflow - Training KPI pipeline
#[derive(Parser, Debug)]
#[command(name = "kpiflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path [default: kpiflow.yml, if present]
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path (DuckDB file or :memory:)
    #[arg(long, global = true, env = "KPIFLOW_DATABASE")]
    pub database: Option<String>,

    /// Override the raw CSV directory
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the raw CSV sources into the store
    Ingest,

    /// Rebuild the intermediate and fact tables from the raw tables
    Transform(TransformArgs),

    /// Ingest, then transform, under a single run lock
    Run(TransformArgs),

    /// Serve tables over HTTP
    Serve(ServeArgs),
}

/// Arguments for the transform and run commands
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Override how enrollments with several feedback rows are handled
    #[arg(long, value_enum)]
    pub feedback_policy: Option<FeedbackPolicyArg>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Feedback policy choices
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPolicyArg {
    /// One fact row per feedback row
    FanOut,
    /// Only the last ingested feedback row per enrollment
    Latest,
}

impl From<FeedbackPolicyArg> for FeedbackPolicy {
    fn from(arg: FeedbackPolicyArg) -> Self {
        match arg {
            FeedbackPolicyArg::FanOut => FeedbackPolicy::FanOut,
            FeedbackPolicyArg::Latest => FeedbackPolicy::Latest,
        }
    }
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    pub port: Option<u16>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
