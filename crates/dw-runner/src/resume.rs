//! Deciding between resuming the last run and starting a new one.

use crate::error::{RunnerError, RunnerResult};
use crate::schedule::Schedule;
use dw_ledger::{RunRecord, RunStatus, UnitRecord};

/// What the operator asked for about a failed previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeChoice {
    /// No choice made; a failed previous run blocks the new one
    #[default]
    Unspecified,
    Resume,
    NewRun,
}

/// Outcome of the resume decision.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDecision {
    StartNew,
    Resume(RunRecord),
}

/// Decide how to proceed given the most recent run.
///
/// - RUNNING: refused; the process that owned it may have crashed.
/// - SUCCESSFUL or no run at all: a new run; asking to resume is an error.
/// - Anything else (a failed or never-started run): the operator must
///   choose. Discarding it while also rebuilding the physical model is
///   refused.
pub fn decide(
    last: Option<&RunRecord>,
    choice: ResumeChoice,
    rebuild: bool,
) -> RunnerResult<RunDecision> {
    let Some(last) = last else {
        return match choice {
            ResumeChoice::Resume => Err(RunnerError::NothingToResume(
                "no run has been recorded yet".to_string(),
            )),
            _ => Ok(RunDecision::StartNew),
        };
    };

    match (last.status, choice) {
        (RunStatus::Running, _) => Err(RunnerError::RunInProgress {
            run_id: last.run_id,
        }),
        (RunStatus::Successful, ResumeChoice::Resume) => Err(RunnerError::NothingToResume(
            format!("run {} completed successfully", last.run_id),
        )),
        (RunStatus::Successful, _) => Ok(RunDecision::StartNew),
        (_, ResumeChoice::Unspecified) => Err(RunnerError::ResumeRequired {
            run_id: last.run_id,
            status: last.status.to_string(),
        }),
        (_, ResumeChoice::Resume) => Ok(RunDecision::Resume(last.clone())),
        (_, ResumeChoice::NewRun) if rebuild => Err(RunnerError::DiscardWithRebuild {
            run_id: last.run_id,
        }),
        (_, ResumeChoice::NewRun) => {
            log::info!("Discarding failed run {}", last.run_id);
            Ok(RunDecision::StartNew)
        }
    }
}

/// A resumed run must record exactly the units of the current schedule.
///
/// Units recorded but no longer scheduled, scheduled but never recorded, or
/// a run with no records at all are refused: completing such a run would
/// mark it SUCCESSFUL without having run what a fresh run would.
pub fn check_resumable(
    run: &RunRecord,
    recorded: &[UnitRecord],
    schedule: &Schedule,
) -> RunnerResult<()> {
    let changed = |detail: String| RunnerError::ScheduleChanged {
        run_id: run.run_id,
        detail,
    };
    if recorded.is_empty() {
        return Err(changed("no work units were recorded for it".to_string()));
    }
    if let Some(missing) = recorded.iter().find(|u| !schedule.contains(&u.name)) {
        return Err(changed(format!(
            "unit '{}' is no longer part of the schedule",
            missing.name
        )));
    }
    if let Some(added) = schedule
        .names()
        .into_iter()
        .find(|name| !recorded.iter().any(|u| u.name == *name))
    {
        return Err(changed(format!(
            "unit '{added}' was not part of the schedule it started with"
        )));
    }
    Ok(())
}

/// A structural rebuild outside a run needs the last run to be resolved.
pub fn check_rebuild_allowed(last: Option<&RunRecord>) -> RunnerResult<()> {
    match last {
        Some(run) if run.status == RunStatus::Running => Err(RunnerError::RunInProgress {
            run_id: run.run_id,
        }),
        Some(run) if run.status != RunStatus::Successful => {
            Err(RunnerError::DiscardWithRebuild { run_id: run.run_id })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "resume_test.rs"]
mod tests;
