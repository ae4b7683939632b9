//! Status command implementation

use anyhow::{Context, Result};
use dw_ledger::{DatasetStats, Ledger, RunRecord, StepRecord, UnitRecord};
use serde::Serialize;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{format_time, load_project, open_ledger};

/// Recorded on a run and its interrupted units by `--mark-failed`.
const ABANDONED_MESSAGE: &str =
    "process ended while the run was RUNNING; marked failed by the operator";

/// A run with everything recorded about it.
#[derive(Debug, Serialize)]
struct RunReport {
    run: RunRecord,
    units: Vec<UnitRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<StepRecord>>,
    datasets: Vec<DatasetStats>,
}

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let ledger = open_ledger(&project)?;

    if let Some(run_id) = args.mark_failed {
        ledger
            .mark_run_abandoned(run_id, ABANDONED_MESSAGE)
            .with_context(|| format!("Failed to mark run {run_id} as failed"))?;
        println!(
            "  \u{2717} Run {run_id} marked FAILED_WITH_ERROR; continue with `dw run --resume` or `--new-run`"
        );
        return Ok(());
    }

    if args.all {
        let runs = ledger.list_runs(args.limit)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&runs)?);
        } else {
            print_runs(&runs);
        }
        return Ok(());
    }

    let run = match args.run {
        Some(run_id) => ledger
            .get_run(run_id)
            .with_context(|| format!("Run {run_id} not found"))?,
        None => match ledger.last_run()? {
            Some(run) => run,
            None => {
                if args.json {
                    println!("null");
                } else {
                    println!("No runs recorded yet.");
                }
                return Ok(());
            }
        },
    };

    let report = build_report(&ledger, run, args.steps)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build_report(ledger: &Ledger, run: RunRecord, with_steps: bool) -> Result<RunReport> {
    let run_id = run.run_id;
    let steps = if with_steps {
        Some(ledger.steps(run_id)?)
    } else {
        None
    };
    Ok(RunReport {
        units: ledger.units(run_id)?,
        datasets: ledger.dataset_stats(run_id)?,
        steps,
        run,
    })
}

fn print_runs(runs: &[RunRecord]) {
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }
    println!(
        "{:>6}  {:<18}  {:<12}  {:<32}  {:<19}  {:<19}",
        "RUN", "STATUS", "MODE", "STAGES", "STARTED", "ENDED"
    );
    for run in runs {
        println!(
            "{:>6}  {:<18}  {:<12}  {:<32}  {:<19}  {:<19}",
            run.run_id,
            run.status.as_str(),
            run.mode.as_str(),
            run.stages.to_string(),
            format_time(Some(run.started_at)),
            format_time(run.ended_at)
        );
    }
}

fn print_report(report: &RunReport) {
    let run = &report.run;
    println!("Run {}: {}", run.run_id, run.status);
    println!("  mode:    {}", run.mode);
    println!("  stages:  {}", run.stages);
    println!("  rebuild: {}", run.rebuild);
    println!("  started: {}", format_time(Some(run.started_at)));
    println!("  ended:   {}", format_time(run.ended_at));
    if let Some(message) = &run.message {
        println!("  message: {message}");
    }

    println!();
    for unit in &report.units {
        let marker = match unit.status {
            dw_ledger::UnitStatus::Successful => "\u{2713}",
            dw_ledger::UnitStatus::FinishedWithError => "\u{2717}",
            dw_ledger::UnitStatus::Running => "~",
            dw_ledger::UnitStatus::Pending => "-",
        };
        let duration = match (unit.started_at, unit.ended_at) {
            (Some(start), Some(end)) => format!(" [{}ms]", (end - start).num_milliseconds()),
            _ => String::new(),
        };
        println!(
            "  {marker} {:>3}. {:<10} {} ({}){duration}",
            unit.sequence,
            unit.stage.as_str(),
            unit.name,
            unit.status
        );
        if let Some(steps) = &report.steps {
            for step in steps.iter().filter(|s| s.unit_name == unit.name.as_str()) {
                let message = step
                    .message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default();
                println!(
                    "         {}. {} ({}){message}",
                    step.step_seq, step.step_name, step.status
                );
            }
        }
    }

    if !report.datasets.is_empty() {
        println!("\nDatasets written:");
        for stats in &report.datasets {
            println!(
                "  {:<40} {:>10} row(s) {:>4} column(s)  ({})",
                stats.dataset, stats.row_count, stats.column_count, stats.unit_name
            );
        }
    }
}
