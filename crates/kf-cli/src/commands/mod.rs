//! CLI command implementations

pub(crate) mod common;
pub(crate) mod ingest;
pub(crate) mod run;
pub(crate) mod serve;
pub(crate) mod transform;
