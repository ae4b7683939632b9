//! Top-level run orchestration: resume decision, scheduling and execution.

use crate::context::RunContext;
use crate::engine::{execute, RunOutcome, UnitEvent};
use crate::error::{RunnerError, RunnerResult};
use crate::resume::{check_resumable, decide, ResumeChoice, RunDecision};
use crate::schedule::{construct_schedule, declare_units, Schedule, UnitKind};
use crate::units::{build_units, prepare};
use dw_core::{Project, RunMode, Stage, StageSet};
use dw_db::Database;
use dw_ledger::Ledger;
use dw_sql::{PreparedSql, SqlRenderer, TemplateContext};

/// Timestamp format written into audit columns.
const LOAD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the operator asked to run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub mode: RunMode,
    pub stages: StageSet,
    /// Drop and recreate the physical model before loading
    pub rebuild: bool,
    pub choice: ResumeChoice,
    /// Named target whose overrides apply
    pub target: Option<String>,
}

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: i64,
    pub resumed: bool,
    pub outcome: RunOutcome,
}

/// The schedule a run would execute, with every SQL step rendered.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    pub schedule: Schedule,
    pub sql: Vec<PreparedSql>,
}

/// Only full reloads can run LOAD.
pub fn check_mode(mode: RunMode, stages: &StageSet) -> RunnerResult<()> {
    if mode == RunMode::Incremental && stages.contains(Stage::Load) {
        return Err(RunnerError::IncrementalLoad);
    }
    Ok(())
}

/// Run (or resume) the pipeline.
///
/// A resumed run keeps the mode, stages and rebuild flag it was created with;
/// the request only supplies the resume choice and target.
pub async fn run_pipeline(
    project: &Project,
    db: &dyn Database,
    ledger: &Ledger,
    request: &RunRequest,
    on_event: &mut (dyn FnMut(UnitEvent<'_>) + Send),
) -> RunnerResult<RunSummary> {
    check_mode(request.mode, &request.stages)?;

    let last = ledger.last_run()?;
    let decision = decide(last.as_ref(), request.choice, request.rebuild)?;
    let (mode, stages, rebuild) = match &decision {
        RunDecision::Resume(run) => {
            if run.mode != request.mode || run.stages != request.stages || run.rebuild != request.rebuild {
                log::warn!(
                    "Resuming run {} with its recorded settings ({}, stages {}, rebuild {})",
                    run.run_id,
                    run.mode,
                    run.stages,
                    run.rebuild
                );
            }
            (run.mode, run.stages.clone(), run.rebuild)
        }
        RunDecision::StartNew => (request.mode, request.stages.clone(), request.rebuild),
    };

    let target = request.target.as_deref();
    let schedule = build_schedule(project, db, &stages, rebuild).await?;
    let source_system = project.config.get_source_system(target).to_string();
    let vars = project.config.get_merged_vars(target);
    let renderer = SqlRenderer::new(&TemplateContext {
        layers: &project.config.layers,
        source_system: &source_system,
        run_mode: mode,
        vars: &vars,
    });
    let units = build_units(project, &schedule, &renderer)?;

    if !rebuild {
        verify_physical_model(project, db, &schedule).await?;
    }

    let (run, resumed) = match decision {
        RunDecision::Resume(run) => {
            let recorded = ledger.units(run.run_id)?;
            check_resumable(&run, &recorded, &schedule)?;
            log::info!("Resuming run {}", run.run_id);
            (run, true)
        }
        RunDecision::StartNew => {
            let run = ledger
                .create_run(mode, &stages, rebuild, &schedule.to_new_units())
                .map_err(|e| {
                    ledger.escalate("create run", &e);
                    RunnerError::Ledger(e)
                })?;
            log::info!("Started run {} ({} unit(s))", run.run_id, schedule.len());
            (run, false)
        }
    };

    let ctx = RunContext {
        run_id: run.run_id,
        mode,
        project,
        db,
        ledger,
        source_system,
        load_timestamp: run.started_at.format(LOAD_TIMESTAMP_FORMAT).to_string(),
    };
    let outcome = execute(&ctx, &units, on_event).await?;

    Ok(RunSummary {
        run_id: run.run_id,
        resumed,
        outcome,
    })
}

/// Compute the schedule and render its SQL without running anything.
pub async fn plan_pipeline(
    project: &Project,
    db: &dyn Database,
    request: &RunRequest,
) -> RunnerResult<PipelinePlan> {
    check_mode(request.mode, &request.stages)?;
    let schedule = build_schedule(project, db, &request.stages, request.rebuild).await?;

    let target = request.target.as_deref();
    let vars = project.config.get_merged_vars(target);
    let renderer = SqlRenderer::new(&TemplateContext {
        layers: &project.config.layers,
        source_system: project.config.get_source_system(target),
        run_mode: request.mode,
        vars: &vars,
    });

    let mut sql = Vec::new();
    for unit in schedule.units() {
        match &unit.kind {
            UnitKind::Transform { step } => sql.push(prepare(&renderer, &project.transforms, step)?),
            UnitKind::Summarise { step } => sql.push(prepare(&renderer, &project.summaries, step)?),
            _ => {}
        }
    }
    Ok(PipelinePlan { schedule, sql })
}

async fn build_schedule(
    project: &Project,
    db: &dyn Database,
    stages: &StageSet,
    rebuild: bool,
) -> RunnerResult<Schedule> {
    let declared = declare_units(project, db, rebuild).await?;
    construct_schedule(declared, stages)
}

/// Tables the scheduled loads and summaries write must already exist.
async fn verify_physical_model(
    project: &Project,
    db: &dyn Database,
    schedule: &Schedule,
) -> RunnerResult<()> {
    for unit in schedule.units() {
        let name = match &unit.kind {
            UnitKind::LoadDimension { table } | UnitKind::LoadFact { table } => table,
            UnitKind::Summarise { step } => step,
            _ => continue,
        };
        // summaries without a declared table are created by the run itself
        let Some(table) = project.schema.get(name) else {
            continue;
        };
        let schema = project.config.layers.for_kind(table.kind());
        if !db.relation_exists(schema, &table.name).await? {
            return Err(RunnerError::MissingPhysicalModel {
                table: format!("{schema}.{}", table.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
