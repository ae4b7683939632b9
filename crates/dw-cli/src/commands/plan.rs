//! Plan command implementation

use anyhow::{Context, Result};
use dw_db::DuckDbBackend;
use dw_runner::{plan_pipeline, ResumeChoice};

use crate::cli::{GlobalArgs, PlanArgs};
use crate::commands::common::{load_project, resolve_target, run_request};

/// Execute the plan command
///
/// Sources without an explicit table list are inspected through a scratch
/// in-memory connection; the warehouse and the ledger are never opened.
pub async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let request = run_request(
        &args.schedule,
        ResumeChoice::Unspecified,
        resolve_target(global),
    )?;
    let scratch = DuckDbBackend::in_memory().context("Failed to open scratch connection")?;

    let plan = plan_pipeline(&project, &scratch, &request)
        .await
        .context("Failed to plan run")?;

    println!(
        "Schedule for {} ({}, stages {}): {} unit(s)\n",
        project.config.name,
        request.mode,
        request.stages,
        plan.schedule.len()
    );
    for (i, unit) in plan.schedule.units().iter().enumerate() {
        println!("  {:>3}. {:<10} {}", i + 1, unit.stage().as_str(), unit.name);
    }

    if args.sql {
        for prepared in &plan.sql {
            println!("\n-- {} (sha256 {})", prepared.name, prepared.checksum);
            println!("{};", prepared.sql);
        }
    } else if !plan.sql.is_empty() {
        println!(
            "\n  \u{2713} {} SQL step(s) rendered and validated",
            plan.sql.len()
        );
    }
    Ok(())
}
