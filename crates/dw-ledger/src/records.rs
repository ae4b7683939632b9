//! Row types read from and written to the ledger.

use crate::status::{RunStatus, UnitStatus};
use chrono::{DateTime, Utc};
use dw_core::{RunMode, Stage, StageSet, UnitName};
use serde::Serialize;

/// A persisted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id: i64,
    pub status: RunStatus,
    pub mode: RunMode,
    pub stages: StageSet,
    /// Whether the run rebuilds the physical model before loading
    pub rebuild: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Captured failure trace, if any
    pub message: Option<String>,
}

/// A unit to schedule in a new run; sequence numbers are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUnit {
    pub name: UnitName,
    pub stage: Stage,
}

/// A persisted work unit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRecord {
    pub run_id: i64,
    pub name: UnitName,
    /// Contiguous, 1-based, declaration order
    pub sequence: i32,
    pub stage: Stage,
    pub status: UnitStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// A named sub-step of a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub run_id: i64,
    pub unit_name: String,
    pub step_seq: i32,
    pub step_name: String,
    pub status: UnitStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Size of a dataset a unit wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub run_id: i64,
    pub unit_name: String,
    pub dataset: String,
    pub row_count: i64,
    pub column_count: i32,
}
