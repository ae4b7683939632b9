//! The run loop.

use crate::context::RunContext;
use crate::error::RunnerResult;
use crate::unit::{UnitOutcome, WorkUnit};
use dw_core::UnitName;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Final state of an executed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The first failing unit and its trace
    Fail { unit: UnitName, trace: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

/// Progress notifications emitted while a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent<'e> {
    /// Already SUCCESSFUL in this run
    Skipped { name: &'e str },
    Started {
        name: &'e str,
        sequence: i32,
        total: usize,
    },
    Succeeded { name: &'e str, elapsed: Duration },
    Failed {
        name: &'e str,
        elapsed: Duration,
        trace: &'e str,
    },
}

/// Execute the run's work units in ledger order.
///
/// Units already SUCCESSFUL are skipped. Every other unit is marked RUNNING,
/// invoked, and marked SUCCESSFUL or FINISHED_WITH_ERROR. The first failure
/// marks the run FAILED_WITH_ERROR with the unit's trace and stops the loop.
/// When every unit succeeds the key maps are discarded and the run is marked
/// SUCCESSFUL.
///
/// An `Err` means the ledger itself could not be written; the failure has
/// already been escalated to the fallback log.
pub async fn execute(
    ctx: &RunContext<'_>,
    units: &[Box<dyn WorkUnit>],
    on_event: &mut (dyn FnMut(UnitEvent<'_>) + Send),
) -> RunnerResult<RunOutcome> {
    let run_id = ctx.run_id;
    let records = ctx.ledger_write("read work units", ctx.ledger.units(run_id))?;
    let by_name: HashMap<&str, &dyn WorkUnit> = units
        .iter()
        .map(|u| (u.name().as_str(), u.as_ref()))
        .collect();

    ctx.ledger_write("mark run running", ctx.ledger.mark_run_running(run_id))?;
    log::info!("Run {run_id}: {} unit(s)", records.len());

    let total = records.len();
    for record in &records {
        let name = record.name.as_str();
        if record.status.is_successful() {
            log::debug!("Skipping {name}: already successful in run {run_id}");
            on_event(UnitEvent::Skipped { name });
            continue;
        }

        let started = Instant::now();
        ctx.ledger_write("mark unit running", ctx.ledger.mark_unit_running(run_id, name))?;
        on_event(UnitEvent::Started {
            name,
            sequence: record.sequence,
            total,
        });
        log::info!("Unit {name} ({}) started", record.stage);

        let outcome = match by_name.get(name) {
            Some(unit) => unit.run(ctx).await,
            None => UnitOutcome::Failure(format!("unit '{name}' is not part of this schedule")),
        };

        match outcome {
            UnitOutcome::Success => {
                ctx.ledger_write(
                    "mark unit successful",
                    ctx.ledger.mark_unit_successful(run_id, name),
                )?;
                log::info!("Unit {name} finished");
                on_event(UnitEvent::Succeeded {
                    name,
                    elapsed: started.elapsed(),
                });
            }
            UnitOutcome::Failure(trace) => {
                log::error!("Unit {name} failed: {trace}");
                ctx.ledger_write(
                    "mark unit failed",
                    ctx.ledger.mark_unit_failed(run_id, name, &trace),
                )?;
                ctx.ledger_write("mark run failed", ctx.ledger.mark_run_failed(run_id, &trace))?;
                on_event(UnitEvent::Failed {
                    name,
                    elapsed: started.elapsed(),
                    trace: &trace,
                });
                return Ok(RunOutcome::Fail {
                    unit: record.name.clone(),
                    trace,
                });
            }
        }
    }

    match dw_keys::discard_key_maps(ctx.db, ctx.layers()).await {
        Ok(_) => {}
        Err(e) => log::warn!("Failed to discard key maps after run {run_id}: {e}"),
    }
    ctx.ledger_write("mark run successful", ctx.ledger.mark_run_successful(run_id))?;
    log::info!("Run {run_id} successful");
    Ok(RunOutcome::Success)
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
