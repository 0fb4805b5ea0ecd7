//! kf-api - Read endpoint for kpiflow
//!
//! Serves raw and derived tables as JSON record arrays. The endpoint is a
//! stateless pass-through: every request opens its own read-only connection
//! and reads the table's current snapshot.

pub mod error;
pub mod routes;
pub mod store;

pub use error::ApiError;
pub use routes::{fetch_table, router, WELCOME};
pub use store::Store;
