//! dw-runner - Resumable execution engine for dwflow
//!
//! A run is an ordered list of named work units recorded in the ledger.
//! Units run one at a time in stage order (EXTRACT, TRANSFORM, LOAD,
//! SUMMARISE, with dimensions before facts inside LOAD). A failed run can be
//! resumed: units that already succeeded are skipped and the rest run again
//! under the same run id.

pub mod context;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod resume;
pub mod schedule;
pub mod unit;
pub mod units;

pub use context::RunContext;
pub use engine::{execute, RunOutcome, UnitEvent};
pub use error::{RunnerError, RunnerResult};
pub use model::rebuild_physical_model;
pub use pipeline::{check_mode, plan_pipeline, run_pipeline, PipelinePlan, RunRequest, RunSummary};
pub use resume::{check_rebuild_allowed, check_resumable, decide, ResumeChoice, RunDecision};
pub use schedule::{construct_schedule, declare_units, PlannedUnit, Schedule, UnitKind, REBUILD_UNIT};
pub use unit::{UnitOutcome, WorkUnit};
