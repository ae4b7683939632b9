//! Drop and recreate the physical model.

use crate::context::RunContext;
use crate::error::RunnerResult;
use crate::model::apply_physical_model;
use crate::unit::{UnitOutcome, WorkUnit};
use async_trait::async_trait;
use dw_core::{Stage, UnitName};
use dw_ddl::ApplySummary;

pub struct RebuildUnit {
    name: UnitName,
}

impl RebuildUnit {
    pub fn new(name: UnitName) -> Self {
        Self { name }
    }

    async fn apply(&self, ctx: &RunContext<'_>) -> RunnerResult<ApplySummary> {
        apply_physical_model(ctx.project, ctx.db).await
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        let summary = ctx.step(&self.name, "apply_plan", self.apply(ctx)).await?;
        ctx.note(
            &self.name,
            "plan_summary",
            &format!(
                "{} statement(s) executed, {} foreign-key statement(s) skipped",
                summary.executed, summary.skipped
            ),
        )?;
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for RebuildUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Load
    }

    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome {
        self.execute(ctx).await.into()
    }
}
