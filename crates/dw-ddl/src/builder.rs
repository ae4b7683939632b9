//! Schema-driven DDL generation.

use crate::error::{DdlError, DdlResult};
use crate::plan::DdlPlan;
use crate::statement::{DdlKind, DdlStatement};
use dw_core::schema::AUDIT_COLUMNS;
use dw_core::sql_utils::{qualify, quote_ident, string_literal, yaml_literal};
use dw_core::{ColumnRole, ColumnSchema, Layers, SchemaModel, TableKind, TableSchema};

/// Creation order of table groups; drops run in reverse.
const CREATE_ORDER: [TableKind; 4] = [
    TableKind::Dimension,
    TableKind::Other,
    TableKind::Fact,
    TableKind::Summary,
];

/// Values written into the audit columns of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditValues {
    pub source_system: String,
    /// `YYYY-MM-DD HH:MM:SS` timestamp of the run
    pub load_timestamp: String,
    /// e.g. `INSERT`
    pub operation: String,
}

impl AuditValues {
    /// SQL expressions for [`AUDIT_COLUMNS`], in column order.
    pub fn sql_values(&self) -> Vec<String> {
        vec![
            string_literal(&self.source_system),
            format!("CAST({} AS TIMESTAMP)", string_literal(&self.load_timestamp)),
            "CAST(NULL AS TIMESTAMP)".to_string(),
            string_literal(&self.operation),
        ]
    }
}

/// Builds DDL for tables of one schema model laid out in the given layers.
pub struct PhysicalModelBuilder<'a> {
    model: &'a SchemaModel,
    layers: &'a Layers,
}

impl<'a> PhysicalModelBuilder<'a> {
    pub fn new(model: &'a SchemaModel, layers: &'a Layers) -> Self {
        Self { model, layers }
    }

    /// Look up a table of the model.
    pub fn table(&self, name: &str) -> DdlResult<&'a TableSchema> {
        self.model
            .get(name)
            .ok_or_else(|| DdlError::TableNotFound(name.to_string()))
    }

    /// Schema (layer) a table lives in.
    pub fn schema_of(&self, table: &TableSchema) -> &'a str {
        self.layers.for_kind(table.kind())
    }

    /// Quoted, schema-qualified relation name of a table.
    pub fn relation(&self, table: &TableSchema) -> String {
        qualify(self.schema_of(table), &table.name)
    }

    fn sequence_name(table: &TableSchema) -> String {
        format!("seq_{}", table.name)
    }

    fn index_name(table: &TableSchema, column: &ColumnSchema) -> String {
        match column.role {
            ColumnRole::SurrogateKey => format!("ux_{}_{}", table.name, column.name),
            _ => format!("idx_{}_{}", table.name, column.name),
        }
    }

    fn constraint_name(table: &TableSchema, column: &ColumnSchema) -> String {
        format!("fk_{}_{}", table.name, column.name)
    }

    fn column_definition(&self, table: &TableSchema, column: &ColumnSchema) -> String {
        match column.role {
            ColumnRole::SurrogateKey => format!(
                "{} {} NOT NULL DEFAULT nextval({})",
                quote_ident(&column.name),
                column.data_type,
                string_literal(&format!(
                    "{}.{}",
                    self.schema_of(table),
                    Self::sequence_name(table)
                ))
            ),
            _ => format!("{} {}", quote_ident(&column.name), column.data_type),
        }
    }

    /// `CREATE SCHEMA IF NOT EXISTS` for every layer.
    pub fn schema_statements(&self) -> Vec<DdlStatement> {
        self.layers
            .all()
            .iter()
            .map(|schema| {
                DdlStatement::new(
                    DdlKind::CreateSchema,
                    *schema,
                    *schema,
                    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)),
                )
            })
            .collect()
    }

    /// Sequence (for a surrogate key) then table.
    ///
    /// Declared columns come first in declaration order; tables carrying audit
    /// columns get them appended.
    pub fn create_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let schema = self.schema_of(table);
        let relation = self.relation(table);
        let mut stmts = Vec::new();

        if table.surrogate_key().is_some() {
            let seq = Self::sequence_name(table);
            stmts.push(DdlStatement::new(
                DdlKind::CreateSequence,
                table.name.as_str(),
                seq.as_str(),
                format!("CREATE SEQUENCE {} START 1", qualify(schema, &seq)),
            ));
        }

        let mut columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(table, c)))
            .collect();
        if table.has_audit_columns() {
            columns.extend(
                AUDIT_COLUMNS
                    .iter()
                    .map(|(name, ty)| format!("    {} {ty}", quote_ident(name))),
            );
        }

        stmts.push(DdlStatement::new(
            DdlKind::CreateTable,
            table.name.as_str(),
            table.name.as_str(),
            format!("CREATE TABLE {relation} (\n{}\n)", columns.join(",\n")),
        ));
        stmts
    }

    /// One index per surrogate-key (unique) and foreign-key column.
    pub fn index_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let relation = self.relation(table);
        table
            .columns
            .iter()
            .filter(|c| matches!(c.role, ColumnRole::SurrogateKey | ColumnRole::ForeignKey))
            .map(|c| {
                let name = Self::index_name(table, c);
                let unique = if c.role == ColumnRole::SurrogateKey {
                    "UNIQUE "
                } else {
                    ""
                };
                DdlStatement::new(
                    DdlKind::CreateIndex,
                    table.name.as_str(),
                    name.as_str(),
                    format!(
                        "CREATE {unique}INDEX {} ON {relation} ({})",
                        quote_ident(&name),
                        quote_ident(&c.name)
                    ),
                )
            })
            .collect()
    }

    /// A constraint per foreign key referencing the dimension's surrogate key.
    pub fn constraint_statements(&self, table: &TableSchema) -> DdlResult<Vec<DdlStatement>> {
        let relation = self.relation(table);
        table
            .foreign_keys()
            .into_iter()
            .map(|fk| {
                let target = self.referenced_dimension(table, fk)?;
                let target_sk = target.surrogate_key().ok_or_else(|| DdlError::Invalid {
                    table: table.name.to_string(),
                    message: format!("dimension '{}' has no surrogate key", target.name),
                })?;
                let name = Self::constraint_name(table, fk);
                Ok(DdlStatement::new(
                    DdlKind::AddForeignKey,
                    table.name.as_str(),
                    name.as_str(),
                    format!(
                        "ALTER TABLE {relation} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                        quote_ident(&name),
                        quote_ident(&fk.name),
                        self.relation(target),
                        quote_ident(&target_sk.name)
                    ),
                ))
            })
            .collect()
    }

    fn referenced_dimension(
        &self,
        table: &TableSchema,
        fk: &ColumnSchema,
    ) -> DdlResult<&'a TableSchema> {
        let target = fk.references.as_ref().ok_or_else(|| DdlError::Invalid {
            table: table.name.to_string(),
            message: format!("foreign key '{}' has no referenced dimension", fk.name),
        })?;
        self.table(target)
    }

    fn drop_constraint_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let relation = self.relation(table);
        table
            .foreign_keys()
            .into_iter()
            .map(|fk| {
                let name = Self::constraint_name(table, fk);
                DdlStatement::new(
                    DdlKind::DropForeignKey,
                    table.name.as_str(),
                    name.as_str(),
                    format!(
                        "ALTER TABLE IF EXISTS {relation} DROP CONSTRAINT IF EXISTS {}",
                        quote_ident(&name)
                    ),
                )
            })
            .collect()
    }

    fn drop_index_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let schema = self.schema_of(table);
        self.index_statements(table)
            .into_iter()
            .map(|idx| {
                let sql = format!("DROP INDEX IF EXISTS {}", qualify(schema, &idx.object));
                DdlStatement::new(DdlKind::DropIndex, idx.table, idx.object, sql)
            })
            .collect()
    }

    fn drop_table_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let schema = self.schema_of(table);
        let mut stmts = vec![DdlStatement::new(
            DdlKind::DropTable,
            table.name.as_str(),
            table.name.as_str(),
            format!("DROP TABLE IF EXISTS {}", self.relation(table)),
        )];
        if table.surrogate_key().is_some() {
            let seq = Self::sequence_name(table);
            stmts.push(DdlStatement::new(
                DdlKind::DropSequence,
                table.name.as_str(),
                seq.as_str(),
                format!("DROP SEQUENCE IF EXISTS {}", qualify(schema, &seq)),
            ));
        }
        stmts
    }

    /// Drops for one table: constraints, indexes, table, sequence.
    pub fn drop_statements(&self, table: &TableSchema) -> Vec<DdlStatement> {
        let mut stmts = self.drop_constraint_statements(table);
        stmts.extend(self.drop_index_statements(table));
        stmts.extend(self.drop_table_statements(table));
        stmts
    }

    /// Inserts for the sentinel and curated rows of a dimension.
    ///
    /// Returns nothing for other table kinds.
    pub fn default_row_statements(
        &self,
        table: &TableSchema,
        audit: &AuditValues,
    ) -> Vec<DdlStatement> {
        let Some(sk) = table.surrogate_key() else {
            return Vec::new();
        };
        if table.kind() != TableKind::Dimension {
            return Vec::new();
        }
        let relation = self.relation(table);

        table
            .effective_default_rows()
            .into_iter()
            .map(|row| {
                let mut columns = vec![quote_ident(&sk.name)];
                let mut values = vec![row.key.to_string()];
                for (col, value) in &row.values {
                    columns.push(quote_ident(col));
                    values.push(yaml_literal(value));
                }
                if table.has_audit_columns() {
                    columns.extend(AUDIT_COLUMNS.iter().map(|(name, _)| quote_ident(name)));
                    values.extend(audit.sql_values());
                }
                DdlStatement::new(
                    DdlKind::InsertDefaultRow,
                    table.name.as_str(),
                    row.key.to_string(),
                    format!(
                        "INSERT INTO {relation} ({}) VALUES ({})",
                        columns.join(", "),
                        values.join(", ")
                    ),
                )
            })
            .collect()
    }

    fn tables_in_creation_order(&self) -> Vec<&'a TableSchema> {
        CREATE_ORDER
            .iter()
            .flat_map(|kind| self.model.of_kind(*kind))
            .collect()
    }

    /// Drop and recreate every table of the model.
    ///
    /// Drop phase: every foreign-key constraint, then indexes, tables and
    /// sequences in reverse creation order. Create phase: per group
    /// (dimensions, other, facts, summaries) tables then indexes, and finally
    /// the foreign-key constraints once every referenced key is indexed.
    pub fn full_rebuild_plan(&self) -> DdlResult<DdlPlan> {
        let ordered = self.tables_in_creation_order();
        let mut plan = DdlPlan::new(self.schema_statements());

        let reversed: Vec<&TableSchema> = ordered.iter().rev().copied().collect();
        for table in &reversed {
            plan.extend(self.drop_constraint_statements(table));
        }
        for table in &reversed {
            plan.extend(self.drop_index_statements(table));
        }
        for table in &reversed {
            plan.extend(self.drop_table_statements(table));
        }

        for kind in CREATE_ORDER {
            let group: Vec<&TableSchema> = self.model.of_kind(kind).collect();
            for table in &group {
                plan.extend(self.create_statements(table));
            }
            for table in &group {
                plan.extend(self.index_statements(table));
            }
        }
        for table in &ordered {
            plan.extend(self.constraint_statements(table)?);
        }

        log::debug!(
            "Built physical model plan: {} statement(s) for {} table(s)",
            plan.len(),
            ordered.len()
        );
        Ok(plan)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
