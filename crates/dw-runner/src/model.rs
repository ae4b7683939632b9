//! Rebuilding the physical model of the warehouse.

use crate::error::RunnerResult;
use crate::resume::check_rebuild_allowed;
use dw_core::Project;
use dw_db::Database;
use dw_ddl::{apply_plan, ApplySummary, PhysicalModelBuilder};
use dw_keys::discard_key_maps;
use dw_ledger::Ledger;

/// Drop and recreate every declared table outside of a run.
///
/// Refused while the last recorded run is RUNNING or unresolved: its
/// completed loads would be wiped while the ledger still counts them done.
pub async fn rebuild_physical_model(
    project: &Project,
    db: &dyn Database,
    ledger: &Ledger,
) -> RunnerResult<ApplySummary> {
    check_rebuild_allowed(ledger.last_run()?.as_ref())?;
    apply_physical_model(project, db).await
}

/// Apply the full rebuild plan and drop key maps built against the old tables.
pub(crate) async fn apply_physical_model(
    project: &Project,
    db: &dyn Database,
) -> RunnerResult<ApplySummary> {
    let layers = &project.config.layers;
    let plan = PhysicalModelBuilder::new(&project.schema, layers).full_rebuild_plan()?;
    let summary = apply_plan(db, &plan).await?;
    let discarded = discard_key_maps(db, layers).await?;
    if discarded > 0 {
        log::info!("Dropped {discarded} key map(s) of the previous physical model");
    }
    Ok(summary)
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
