//! Error types for dw-runner

use dw_core::CoreError;
use dw_db::DbError;
use dw_ddl::DdlError;
use dw_keys::KeyError;
use dw_ledger::LedgerError;
use dw_sql::SqlError;
use thiserror::Error;

/// Scheduling, resume and unit execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Project configuration error (R001)
    #[error("[R001] {0}")]
    Config(#[from] CoreError),

    /// Two units share a name (R002)
    #[error("[R002] Duplicate work unit name '{0}'")]
    DuplicateUnit(String),

    /// The last run never finished (R003)
    #[error("[R003] Run {run_id} is still RUNNING; if its process is gone, mark it with `dw status --mark-failed {run_id}`")]
    RunInProgress { run_id: i64 },

    /// The last run failed and no choice was made (R004)
    #[error("[R004] Run {run_id} ended {status}; pass --resume to continue it or --new-run to discard it")]
    ResumeRequired { run_id: i64, status: String },

    /// Discarding a failed run while rebuilding the physical model (R005)
    #[error("[R005] Refusing to discard failed run {run_id} and rebuild the physical model in one step")]
    DiscardWithRebuild { run_id: i64 },

    /// Resume requested but there is no failed run (R006)
    #[error("[R006] Nothing to resume: {0}")]
    NothingToResume(String),

    /// The recorded units no longer match the project (R007)
    #[error("[R007] Cannot resume run {run_id}: {detail}")]
    ScheduleChanged { run_id: i64, detail: String },

    /// Delta loads are not supported (R008)
    #[error("[R008] Incremental mode cannot run the LOAD stage; use full reload or drop LOAD from --stages")]
    IncrementalLoad,

    /// Warehouse lacks the physical model (R009)
    #[error("[R009] Table {table} does not exist; run with --rebuild or `dw ddl --apply` first")]
    MissingPhysicalModel { table: String },

    /// A table the unit needs is not declared correctly (R010)
    #[error("[R010] Unit '{unit}': {message}")]
    InvalidUnit { unit: String, message: String },

    /// Ledger error (R011)
    #[error("[R011] {0}")]
    Ledger(#[from] LedgerError),

    /// Database error (R012)
    #[error("[R012] {0}")]
    Database(#[from] DbError),

    /// SQL template or validation error (R013)
    #[error("[R013] {0}")]
    Sql(#[from] SqlError),

    /// Physical model error (R014)
    #[error("[R014] {0}")]
    Ddl(#[from] DdlError),

    /// Key resolution error (R015)
    #[error("[R015] {0}")]
    Keys(#[from] KeyError),
}

/// Result type alias for RunnerError
pub type RunnerResult<T> = Result<T, RunnerError>;
