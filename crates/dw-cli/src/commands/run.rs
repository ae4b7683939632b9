//! Run command implementation

use anyhow::{Context, Result};
use dw_runner::{run_pipeline, ResumeChoice, RunOutcome, UnitEvent};
use std::time::Instant;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{
    load_project, open_ledger, open_warehouse, resolve_target, run_request, ExitCode,
};

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let start_time = Instant::now();
    let project = load_project(global)?;

    let choice = if args.resume {
        ResumeChoice::Resume
    } else if args.new_run {
        ResumeChoice::NewRun
    } else {
        ResumeChoice::Unspecified
    };
    let request = run_request(&args.schedule, choice, resolve_target(global))?;
    let db = open_warehouse(&project, request.target.as_deref())?;
    let ledger = open_ledger(&project)?;

    println!(
        "Running {} ({}, stages {}{})\n",
        project.config.name,
        request.mode,
        request.stages,
        if request.rebuild { ", rebuild" } else { "" }
    );

    let mut progress = String::new();
    let mut on_event = |event: UnitEvent<'_>| match event {
        UnitEvent::Skipped { name } => println!("  - {name} (already successful)"),
        UnitEvent::Started {
            name,
            sequence,
            total,
        } => {
            progress = format!("[{sequence}/{total}]");
            log::debug!("{progress} {name} started");
        }
        UnitEvent::Succeeded { name, elapsed } => {
            println!("  \u{2713} {progress} {name} [{}ms]", elapsed.as_millis())
        }
        UnitEvent::Failed {
            name,
            elapsed,
            trace,
        } => println!(
            "  \u{2717} {progress} {name} - {trace} [{}ms]",
            elapsed.as_millis()
        ),
    };

    let summary = run_pipeline(&project, &db, &ledger, &request, &mut on_event)
        .await
        .context("Run could not be started")?;

    let verb = if summary.resumed { "Resumed run" } else { "Run" };
    match &summary.outcome {
        RunOutcome::Success => {
            println!(
                "\n{verb} {} completed successfully in {:.1}s",
                summary.run_id,
                start_time.elapsed().as_secs_f64()
            );
            Ok(())
        }
        RunOutcome::Fail { unit, .. } => {
            eprintln!(
                "\n{verb} {} failed at {unit}. Fix the cause and continue with `dw run --resume`.",
                summary.run_id
            );
            Err(ExitCode(1).into())
        }
    }
}
