//! Build-then-swap table materialization.
//!
//! A derived table is never dropped before its replacement exists. The new
//! content is built under a staging name and swapped into place in one
//! transaction.

use kf_core::sql_utils::quote_ident;
use kf_db::{Database, DbResult};

/// Suffix appended to a target table's name while it is being rebuilt
pub const STAGING_SUFFIX: &str = "__kf_staging";

/// Staging table name for `target`
pub fn staging_name(target: &str) -> String {
    format!("{}{}", target, STAGING_SUFFIX)
}

/// Rebuild `target` from `select_sql` and return its new row count.
///
/// If building the staging table fails, `target` is untouched and the
/// staging table is dropped. If the swap fails, the store rolls back and
/// `target` keeps its previous snapshot.
pub async fn materialize(db: &dyn Database, target: &str, select_sql: &str) -> DbResult<usize> {
    let staging = staging_name(target);

    if let Err(e) = db.create_table_as(&staging, select_sql, true).await {
        if let Err(cleanup) = db.drop_if_exists(&staging).await {
            log::warn!("Failed to drop staging table {}: {}", staging, cleanup);
        }
        return Err(e);
    }
    log::debug!("Built {}, swapping into {}", staging, target);

    if let Err(e) = db.swap_table(&staging, target).await {
        if let Err(cleanup) = db.drop_if_exists(&staging).await {
            log::warn!("Failed to drop staging table {}: {}", staging, cleanup);
        }
        return Err(e);
    }

    db.query_count(&format!("SELECT * FROM {}", quote_ident(target)))
        .await
}
