//! Run and unit status labels as persisted in the ledger.

use crate::error::LedgerError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Successful,
    FailedWithError,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Successful => "SUCCESSFUL",
            RunStatus::FailedWithError => "FAILED_WITH_ERROR",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RunStatus::Pending),
            "RUNNING" => Ok(RunStatus::Running),
            "SUCCESSFUL" => Ok(RunStatus::Successful),
            "FAILED_WITH_ERROR" => Ok(RunStatus::FailedWithError),
            other => Err(LedgerError::InvalidValue {
                column: "executions.status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Status of a work unit within a run.
///
/// PENDING → RUNNING → {SUCCESSFUL | FINISHED_WITH_ERROR}. A resumed run moves
/// a FINISHED_WITH_ERROR (or interrupted RUNNING) unit back to RUNNING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Pending,
    Running,
    Successful,
    FinishedWithError,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Pending => "PENDING",
            UnitStatus::Running => "RUNNING",
            UnitStatus::Successful => "SUCCESSFUL",
            UnitStatus::FinishedWithError => "FINISHED_WITH_ERROR",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, UnitStatus::Successful)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(UnitStatus::Pending),
            "RUNNING" => Ok(UnitStatus::Running),
            "SUCCESSFUL" => Ok(UnitStatus::Successful),
            "FINISHED_WITH_ERROR" => Ok(UnitStatus::FinishedWithError),
            other => Err(LedgerError::InvalidValue {
                column: "work_units.status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for s in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Successful,
            RunStatus::FailedWithError,
        ] {
            assert_eq!(s.as_str().parse::<RunStatus>().unwrap(), s);
        }
        assert_eq!(
            "FINISHED_WITH_ERROR".parse::<UnitStatus>().unwrap(),
            UnitStatus::FinishedWithError
        );
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            "DONE".parse::<UnitStatus>(),
            Err(LedgerError::InvalidValue { .. })
        ));
    }
}
