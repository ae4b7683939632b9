//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dw_core::{Config, Project, StageSet};
use dw_db::DuckDbBackend;
use dw_ledger::Ledger;
use dw_runner::{ResumeChoice, RunRequest};
use std::fmt;
use std::path::Path;

use crate::cli::{GlobalArgs, ScheduleArgs};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and the ledger connection closes cleanly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load a project from the directory specified in global CLI arguments.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    Project::load(Path::new(&global.project_dir)).context("Failed to load project")
}

/// Target from `--target`, falling back to `DW_TARGET`.
pub(crate) fn resolve_target(global: &GlobalArgs) -> Option<String> {
    Config::resolve_target(global.target.as_deref())
}

/// Open the warehouse database of the selected target.
pub(crate) fn open_warehouse(project: &Project, target: Option<&str>) -> Result<DuckDbBackend> {
    let db_config = project.config.get_database_config(target)?;
    let path = if db_config.path == ":memory:" {
        db_config.path
    } else {
        project.resolve_path(&db_config.path).display().to_string()
    };
    log::debug!("Using warehouse {path}");
    DuckDbBackend::new(&path).with_context(|| format!("Failed to open warehouse {path}"))
}

/// Open the ledger in the project's target directory.
pub(crate) fn open_ledger(project: &Project) -> Result<Ledger> {
    let target_dir = project.target_dir();
    Ledger::open_in_target(&target_dir)
        .with_context(|| format!("Failed to open ledger in {}", target_dir.display()))
}

/// Translate schedule flags into a run request.
pub(crate) fn run_request(
    args: &ScheduleArgs,
    choice: ResumeChoice,
    target: Option<String>,
) -> Result<RunRequest> {
    let stages = match &args.stages {
        Some(list) => StageSet::parse(list)?,
        None => StageSet::all(),
    };
    Ok(RunRequest {
        mode: args.mode.into(),
        stages,
        rebuild: args.rebuild,
        choice,
        target,
    })
}

/// `YYYY-MM-DD HH:MM:SS`, or `-` when absent.
pub(crate) fn format_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
