//! kf-pipeline - Training KPI transformation pipeline
//!
//! Loads raw CSV sources into the store, then rebuilds two derived tables in
//! order: the enrollment/participant join (stage 1) and the KPI fact table
//! (stage 2). Every rebuild is published with an atomic swap, so a table is
//! always either its previous snapshot or the new one.

pub mod error;
pub mod fact;
pub mod ingest;
pub mod intermediate;
pub mod lock;
pub mod materialize;
pub mod orchestrator;
pub mod stage;

pub use error::PipelineError;
pub use fact::build_fact;
pub use ingest::{ingest_sources, FailedSource, IngestReport, LoadedSource};
pub use intermediate::build_intermediate;
pub use lock::RunLock;
pub use orchestrator::{Orchestrator, RunSummary};
pub use stage::{Stage, StageOutcome};
