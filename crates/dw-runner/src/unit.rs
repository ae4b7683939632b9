//! The work-unit capability and its outcome.

use crate::context::RunContext;
use crate::error::RunnerResult;
use async_trait::async_trait;
use dw_core::{Stage, UnitName};

/// Result of one unit invocation. A failure carries the captured trace that
/// is written to both the unit and the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    Failure(String),
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Success)
    }
}

impl From<RunnerResult<()>> for UnitOutcome {
    fn from(result: RunnerResult<()>) -> Self {
        match result {
            Ok(()) => UnitOutcome::Success,
            Err(e) => UnitOutcome::Failure(e.to_string()),
        }
    }
}

/// One named, ordered piece of pipeline work.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    fn name(&self) -> &UnitName;

    fn stage(&self) -> Stage;

    /// Run the unit. Errors are reported through the outcome, never panics.
    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome;
}
