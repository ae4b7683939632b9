//! EXTRACT: copy a source table into the extract layer.

use crate::context::RunContext;
use crate::error::RunnerResult;
use crate::unit::{UnitOutcome, WorkUnit};
use async_trait::async_trait;
use dw_core::sql_utils::qualify;
use dw_core::{Stage, TableName, UnitName};
use dw_db::TableSource;

pub struct ExtractUnit {
    name: UnitName,
    source: Box<dyn TableSource>,
    table: TableName,
}

impl ExtractUnit {
    pub fn new(name: UnitName, source: Box<dyn TableSource>, table: TableName) -> Self {
        Self {
            name,
            source,
            table,
        }
    }

    /// Table name in the extract layer: `<source>_<table>`.
    pub fn target_table(&self) -> String {
        format!("{}_{}", self.source.name(), self.table)
    }

    async fn copy(&self, ctx: &RunContext<'_>, target: &str) -> RunnerResult<()> {
        let relation = self.source.read_table(ctx.db, &self.table).await?;
        ctx.db
            .create_schema_if_not_exists(&ctx.layers().extract)
            .await?;
        ctx.db
            .create_table_as(target, &format!("SELECT * FROM {relation}"), true)
            .await?;
        Ok(())
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        let layer = &ctx.layers().extract;
        let table = self.target_table();
        let target = qualify(layer, &table);
        ctx.step(&self.name, "copy_table", self.copy(ctx, &target))
            .await?;
        let rows = ctx.record_dataset(&self.name, layer, &table).await?;
        log::info!(
            "Extracted {rows} row(s) from {} ({}) into {target}",
            self.source.name(),
            self.source.kind()
        );
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for ExtractUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Extract
    }

    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome {
        self.execute(ctx).await.into()
    }
}
