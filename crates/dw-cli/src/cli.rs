//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use dw_core::RunMode;

/// dwflow - batch data-warehouse pipeline runner
#[derive(Parser, Debug)]
#[command(name = "dw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline, or resume the last failed run
    Run(RunArgs),

    /// Show recorded runs and their work units
    Status(StatusArgs),

    /// Show the schedule a run would execute without touching the warehouse
    Plan(PlanArgs),

    /// Print or apply the physical model DDL
    Ddl(DdlArgs),
}

/// Run mode
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeArg {
    /// Rebuild every table's contents
    #[default]
    FullReload,
    /// Only extract and transform deltas (no LOAD)
    Incremental,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FullReload => RunMode::FullReload,
            ModeArg::Incremental => RunMode::Incremental,
        }
    }
}

/// Options shared by `run` and `plan`
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Run mode
    #[arg(short, long, value_enum, default_value = "full-reload")]
    pub mode: ModeArg,

    /// Stages to run (comma-separated: extract,transform,load,summarise)
    #[arg(short, long)]
    pub stages: Option<String>,

    /// Drop and recreate the physical model before loading
    #[arg(long)]
    pub rebuild: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Resume the last failed run, skipping units that already succeeded
    #[arg(long, conflicts_with = "new_run")]
    pub resume: bool,

    /// Discard the last failed run and start a new one
    #[arg(long)]
    pub new_run: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single run with its units (default: the latest run)
    #[arg(short, long)]
    pub run: Option<i64>,

    /// List recent runs instead of showing one
    #[arg(short, long)]
    pub all: bool,

    /// Number of runs listed with --all
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Include each unit's sub-steps
    #[arg(long)]
    pub steps: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Mark a RUNNING run whose process is gone as FAILED_WITH_ERROR
    #[arg(long, value_name = "RUN", conflicts_with_all = ["all", "run"])]
    pub mark_failed: Option<i64>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Print the rendered SQL of every transform and summary
    #[arg(long)]
    pub sql: bool,
}

/// Arguments for the ddl command
#[derive(Args, Debug)]
pub struct DdlArgs {
    /// Execute the plan against the warehouse instead of printing it
    #[arg(long)]
    pub apply: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
