//! Execute a DDL plan against a warehouse connection.

use crate::error::{DdlError, DdlResult};
use crate::plan::DdlPlan;
use dw_db::Database;

/// What applying a plan did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub executed: usize,
    /// Foreign-key statements the backend cannot run
    pub skipped: usize,
}

/// Run every statement in order, stopping at the first failure.
///
/// Each statement autocommits; a failure leaves earlier statements applied.
pub async fn apply_plan(db: &dyn Database, plan: &DdlPlan) -> DdlResult<ApplySummary> {
    let skip_foreign_keys = !db.supports_foreign_key_alter();
    let mut summary = ApplySummary::default();

    for (index, stmt) in plan.iter().enumerate() {
        if skip_foreign_keys && stmt.kind.is_foreign_key() {
            log::debug!(
                "Skipping {} {} on {}: unsupported by {}",
                stmt.kind,
                stmt.object,
                stmt.table,
                db.db_type()
            );
            summary.skipped += 1;
            continue;
        }
        db.execute_batch(&stmt.sql)
            .await
            .map_err(|source| DdlError::ApplyFailed {
                index,
                kind: stmt.kind.to_string(),
                table: stmt.table.clone(),
                source,
            })?;
        summary.executed += 1;
    }

    log::info!(
        "Applied {} DDL statement(s), skipped {}",
        summary.executed,
        summary.skipped
    );
    Ok(summary)
}
