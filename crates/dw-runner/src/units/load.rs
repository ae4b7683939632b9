//! LOAD: dimension and fact loads with surrogate-key resolution.

use super::source_relation;
use crate::context::RunContext;
use crate::error::{RunnerError, RunnerResult};
use crate::unit::{UnitOutcome, WorkUnit};
use async_trait::async_trait;
use dw_core::schema::AUDIT_COLUMNS;
use dw_core::sql_utils::{quote_ident, string_literal};
use dw_core::{Stage, TableName, TableSchema, UnitName, AUDIT_KEY_COLUMN, SENTINEL_KEY};
use dw_ddl::{AuditValues, PhysicalModelBuilder};
use dw_keys::{resolve_foreign_key, FactDataset, KeyMap, ResolveStats};

/// Full reload of one dimension.
///
/// Existing rows are deleted, the sentinel and curated default rows are
/// written, source rows are inserted with sequence-assigned surrogate keys,
/// and finally the dimension's key map is built. The audit dimension keeps
/// its history and only gains the row of the current run.
pub struct DimensionLoadUnit {
    name: UnitName,
    table: TableName,
}

impl DimensionLoadUnit {
    pub fn new(name: UnitName, table: TableName) -> Self {
        Self { name, table }
    }

    fn invalid(&self, message: impl Into<String>) -> RunnerError {
        RunnerError::InvalidUnit {
            unit: self.name.to_string(),
            message: message.into(),
        }
    }

    async fn delete_rows(&self, ctx: &RunContext<'_>, relation: &str) -> RunnerResult<usize> {
        Ok(ctx.db.execute(&format!("DELETE FROM {relation}")).await?)
    }

    /// Insert default rows whose key is not present yet.
    async fn ensure_default_rows(
        &self,
        ctx: &RunContext<'_>,
        builder: &PhysicalModelBuilder<'_>,
        dim: &TableSchema,
        audit: &AuditValues,
    ) -> RunnerResult<usize> {
        let sk = dim
            .surrogate_key()
            .ok_or_else(|| self.invalid(format!("{} has no surrogate key", dim.name)))?;
        let relation = builder.relation(dim);
        let mut inserted = 0;
        for stmt in builder.default_row_statements(dim, audit) {
            let present = ctx
                .db
                .query_count(&format!(
                    "SELECT * FROM {relation} WHERE {} = {}",
                    quote_ident(&sk.name),
                    stmt.object
                ))
                .await?;
            if present == 0 {
                ctx.db.execute(&stmt.sql).await?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_source_rows(
        &self,
        ctx: &RunContext<'_>,
        dim: &TableSchema,
        relation: &str,
        audit: &AuditValues,
    ) -> RunnerResult<usize> {
        let mut columns: Vec<String> = dim
            .loadable_columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect();
        let mut values = columns.clone();
        if dim.has_audit_columns() {
            columns.extend(AUDIT_COLUMNS.iter().map(|(name, _)| quote_ident(name)));
            values.extend(audit.sql_values());
        }
        let source = source_relation(ctx.layers(), dim);
        Ok(ctx
            .db
            .execute(&format!(
                "INSERT INTO {relation} ({}) SELECT {} FROM {source}",
                columns.join(", "),
                values.join(", ")
            ))
            .await?)
    }

    /// The audit dimension's row for this run, added once.
    async fn insert_run_row(
        &self,
        ctx: &RunContext<'_>,
        dim: &TableSchema,
        relation: &str,
    ) -> RunnerResult<usize> {
        if dim.column("run_id").is_none() {
            return Err(self.invalid(format!("{} has no run_id column", dim.name)));
        }
        let mut columns = vec![quote_ident("run_id")];
        let mut values = vec![ctx.run_id.to_string()];
        if dim.column("run_mode").is_some() {
            columns.push(quote_ident("run_mode"));
            values.push(string_literal(ctx.mode.as_str()));
        }
        if dim.column("loaded_at").is_some() {
            columns.push(quote_ident("loaded_at"));
            values.push(format!(
                "CAST({} AS TIMESTAMP)",
                string_literal(&ctx.load_timestamp)
            ));
        }
        Ok(ctx
            .db
            .execute(&format!(
                "INSERT INTO {relation} ({}) SELECT {} WHERE NOT EXISTS \
                 (SELECT 1 FROM {relation} WHERE \"run_id\" = {})",
                columns.join(", "),
                values.join(", "),
                ctx.run_id
            ))
            .await?)
    }

    async fn build_key_map(&self, ctx: &RunContext<'_>, dim: &TableSchema) -> RunnerResult<KeyMap> {
        Ok(KeyMap::build(ctx.db, ctx.layers(), dim).await?)
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        let schema = &ctx.project.schema;
        let dim = schema.require(&self.table)?;
        let builder = PhysicalModelBuilder::new(schema, ctx.layers());
        let relation = builder.relation(dim);
        let audit = ctx.audit_values(dim);
        let name = &self.name;

        if dim.is_audit_dimension() {
            ctx.step(
                name,
                "insert_default_rows",
                self.ensure_default_rows(ctx, &builder, dim, &audit),
            )
            .await?;
            ctx.step(name, "insert_run_row", self.insert_run_row(ctx, dim, &relation))
                .await?;
        } else {
            // separate autocommits: DuckDB rejects re-inserting a deleted
            // unique key inside the same transaction
            ctx.step(name, "delete_rows", self.delete_rows(ctx, &relation))
                .await?;
            ctx.step(
                name,
                "insert_default_rows",
                self.ensure_default_rows(ctx, &builder, dim, &audit),
            )
            .await?;
            ctx.step(
                name,
                "insert_rows",
                self.insert_source_rows(ctx, dim, &relation, &audit),
            )
            .await?;
        }

        let rows = ctx
            .record_dataset(name, builder.schema_of(dim), &dim.name)
            .await?;
        let keymap = ctx
            .step(name, "build_key_map", self.build_key_map(ctx, dim))
            .await?;
        log::info!(
            "Loaded {relation}: {rows} row(s), {} natural key(s) mapped",
            keymap.len()
        );
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for DimensionLoadUnit {
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

/// Full reload of one fact table.
///
/// Source rows are staged, every foreign key is resolved through the key map
/// of the dimension it references (unmatched rows get the sentinel key), the
/// audit key is set to this run's audit row, and the table contents are
/// replaced.
pub struct FactLoadUnit {
    name: UnitName,
    table: TableName,
}

impl FactLoadUnit {
    pub fn new(name: UnitName, table: TableName) -> Self {
        Self { name, table }
    }

    async fn stage_rows(
        &self,
        ctx: &RunContext<'_>,
        fact: &TableSchema,
    ) -> RunnerResult<FactDataset> {
        let select = format!("SELECT * FROM {}", source_relation(ctx.layers(), fact));
        Ok(FactDataset::stage(ctx.db, ctx.layers(), fact, &select).await?)
    }

    async fn resolve(
        &self,
        ctx: &RunContext<'_>,
        dataset: &FactDataset,
        fk_column: &str,
        dim: &TableSchema,
    ) -> RunnerResult<ResolveStats> {
        let keymap = KeyMap::open(ctx.db, ctx.layers(), dim).await?;
        Ok(resolve_foreign_key(ctx.db, dataset, fk_column, &keymap).await?)
    }

    async fn audit_key(&self, ctx: &RunContext<'_>, audit_dim: &TableSchema) -> RunnerResult<i64> {
        let keymap = KeyMap::open(ctx.db, ctx.layers(), audit_dim).await?;
        Ok(keymap
            .lookup(ctx.db, &ctx.run_id.to_string())
            .await?
            .unwrap_or(SENTINEL_KEY))
    }

    async fn replace_rows(
        &self,
        ctx: &RunContext<'_>,
        fact: &TableSchema,
        relation: &str,
        dataset: &FactDataset,
        audit_key: i64,
    ) -> RunnerResult<usize> {
        let loadable = fact.loadable_columns();
        let columns: Vec<String> = loadable.iter().map(|c| quote_ident(&c.name)).collect();
        let values: Vec<String> = loadable
            .iter()
            .map(|c| {
                if c.name == AUDIT_KEY_COLUMN {
                    format!("{audit_key} AS {}", quote_ident(&c.name))
                } else {
                    quote_ident(&c.name)
                }
            })
            .collect();

        ctx.db.execute(&format!("DELETE FROM {relation}")).await?;
        Ok(ctx
            .db
            .execute(&format!(
                "INSERT INTO {relation} ({}) SELECT {} FROM {}",
                columns.join(", "),
                values.join(", "),
                dataset.relation()
            ))
            .await?)
    }

    async fn execute(&self, ctx: &RunContext<'_>) -> RunnerResult<()> {
        let schema = &ctx.project.schema;
        let fact = schema.require(&self.table)?;
        let builder = PhysicalModelBuilder::new(schema, ctx.layers());
        let relation = builder.relation(fact);
        let name = &self.name;

        let dataset = ctx.step(name, "stage_rows", self.stage_rows(ctx, fact)).await?;

        let mut audit_key = SENTINEL_KEY;
        for fk in fact.foreign_keys() {
            let Some(dim_name) = &fk.references else {
                continue;
            };
            let dim = schema.require(dim_name)?;
            if dim.is_audit_dimension() {
                audit_key = self.audit_key(ctx, dim).await?;
                continue;
            }
            let stats = ctx
                .step(
                    name,
                    &format!("resolve_{}", fk.name),
                    self.resolve(ctx, &dataset, &fk.name, dim),
                )
                .await?;
            if stats.unmatched > 0 {
                log::warn!(
                    "{name}: {} of {} row(s) have no {dim_name} match for {}; assigned {SENTINEL_KEY}",
                    stats.unmatched,
                    stats.rows,
                    fk.name
                );
            }
        }

        ctx.step(
            name,
            "replace_rows",
            self.replace_rows(ctx, fact, &relation, &dataset, audit_key),
        )
        .await?;
        let rows = ctx
            .record_dataset(name, builder.schema_of(fact), &fact.name)
            .await?;
        dataset.discard(ctx.db).await?;
        log::info!("Loaded {relation}: {rows} row(s)");
        Ok(())
    }
}

#[async_trait]
impl WorkUnit for FactLoadUnit {
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
