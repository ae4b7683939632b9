//! TRANSFORM and SUMMARISE: materialise rendered SQL steps.

use crate::context::RunContext;
use crate::error::RunnerResult;
use crate::unit::{UnitOutcome, WorkUnit};
use async_trait::async_trait;
use dw_core::schema::AUDIT_COLUMNS;
use dw_core::sql_utils::{qualify, quote_ident};
use dw_core::{Stage, TableName, TableSchema, UnitName};
use dw_ddl::PhysicalModelBuilder;
use dw_sql::PreparedSql;

/// Step name under which the executed SQL's checksum is recorded.
const CHECKSUM_STEP: &str = "sql_checksum";

pub struct TransformUnit {
    name: UnitName,
    step: TableName,
    sql: PreparedSql,
}

impl TransformUnit {
    pub fn new(name: UnitName, step: TableName, sql: PreparedSql) -> Self {
        Self { name, step, sql }
    }

    async fn materialise(
        &self,
        ctx: &RunContext<'_>,
        layer: &str,
        target: &str,
    ) -> RunnerResult<()> {
        ctx.db.create_schema_if_not_exists(layer).await?;
        ctx.db.create_table_as(target, &self.sql.sql, true).await?;
        Ok(())
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        let layer = &ctx.layers().transform;
        let target = qualify(layer, &self.step);
        ctx.note(&self.name, CHECKSUM_STEP, &self.sql.checksum)?;
        ctx.step(&self.name, "materialise", self.materialise(ctx, layer, &target))
            .await?;
        let rows = ctx.record_dataset(&self.name, layer, &self.step).await?;
        log::info!("Materialised {target}: {rows} row(s)");
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for TransformUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Transform
    }

    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome {
        self.execute(ctx).await.into()
    }
}

/// Summary step. When the schema model declares a table of the same name the
/// rows replace that table's contents; otherwise the summary layer gets a
/// fresh table shaped by the query.
pub struct SummaryUnit {
    name: UnitName,
    step: TableName,
    sql: PreparedSql,
}

impl SummaryUnit {
    pub fn new(name: UnitName, step: TableName, sql: PreparedSql) -> Self {
        Self { name, step, sql }
    }

    async fn replace_rows(
        &self,
        ctx: &RunContext<'_>,
        table: &TableSchema,
        relation: &str,
    ) -> RunnerResult<()> {
        ctx.db.execute(&format!("DELETE FROM {relation}")).await?;

        let mut select = vec!["q.*".to_string()];
        if table.has_audit_columns() {
            let audit = ctx.audit_values(table).sql_values();
            select.extend(
                AUDIT_COLUMNS
                    .iter()
                    .zip(audit)
                    .map(|((name, _), value)| format!("{value} AS {}", quote_ident(name))),
            );
        }
        ctx.db
            .execute(&format!(
                "INSERT INTO {relation} BY NAME (SELECT {} FROM ({}) q)",
                select.join(", "),
                self.sql.sql
            ))
            .await?;
        Ok(())
    }

    async fn materialise(
        &self,
        ctx: &RunContext<'_>,
        layer: &str,
        target: &str,
    ) -> RunnerResult<()> {
        ctx.db.create_schema_if_not_exists(layer).await?;
        ctx.db.create_table_as(target, &self.sql.sql, true).await?;
        Ok(())
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        ctx.note(&self.name, CHECKSUM_STEP, &self.sql.checksum)?;

        let layers = ctx.layers();
        let (schema, relation) = match ctx.project.schema.get(&self.step) {
            Some(table) => {
                let builder = PhysicalModelBuilder::new(&ctx.project.schema, layers);
                let relation = builder.relation(table);
                ctx.step(
                    &self.name,
                    "replace_rows",
                    self.replace_rows(ctx, table, &relation),
                )
                .await?;
                (builder.schema_of(table), relation)
            }
            None => {
                let relation = qualify(&layers.summary, &self.step);
                ctx.step(
                    &self.name,
                    "materialise",
                    self.materialise(ctx, &layers.summary, &relation),
                )
                .await?;
                (layers.summary.as_str(), relation)
            }
        };

        let rows = ctx.record_dataset(&self.name, schema, &self.step).await?;
        log::info!("Summarised into {relation}: {rows} row(s)");
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for SummaryUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Summarise
    }

    async fn run(&self, ctx: &RunContext<'_>) -> UnitOutcome {
        self.execute(ctx).await.into()
    }
}
