//! Ddl command implementation

use anyhow::{Context, Result};
use dw_db::Database;
use dw_ddl::PhysicalModelBuilder;
use dw_runner::rebuild_physical_model;

use crate::cli::{DdlArgs, GlobalArgs};
use crate::commands::common::{load_project, open_ledger, open_warehouse, resolve_target};

/// Execute the ddl command
pub async fn execute(args: &DdlArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    if project.schema.is_empty() {
        println!("No tables declared under {:?}", project.config.schema_paths);
        return Ok(());
    }

    let builder = PhysicalModelBuilder::new(&project.schema, &project.config.layers);
    let plan = builder
        .full_rebuild_plan()
        .context("Failed to build physical model")?;

    if !args.apply {
        // the printed script shows what `--apply` would run on DuckDB
        print!("{}", plan.render(true));
        return Ok(());
    }

    let target = resolve_target(global);
    let ledger = open_ledger(&project)?;
    let db = open_warehouse(&project, target.as_deref())?;
    let summary = rebuild_physical_model(&project, &db, &ledger)
        .await
        .context("Failed to apply physical model")?;
    for (kind, count) in plan.kind_counts() {
        log::debug!("{kind}: {count}");
    }
    println!(
        "  \u{2713} Applied {} statement(s) to {} ({} foreign-key statement(s) skipped)",
        summary.executed,
        db.db_type(),
        summary.skipped
    );
    Ok(())
}
