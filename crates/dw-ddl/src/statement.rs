//! A single DDL statement with enough metadata to order and filter it.

use serde::Serialize;
use std::fmt;

/// What a statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlKind {
    CreateSchema,
    CreateSequence,
    CreateTable,
    CreateIndex,
    AddForeignKey,
    DropForeignKey,
    DropIndex,
    DropTable,
    DropSequence,
    InsertDefaultRow,
}

impl DdlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DdlKind::CreateSchema => "create_schema",
            DdlKind::CreateSequence => "create_sequence",
            DdlKind::CreateTable => "create_table",
            DdlKind::CreateIndex => "create_index",
            DdlKind::AddForeignKey => "add_foreign_key",
            DdlKind::DropForeignKey => "drop_foreign_key",
            DdlKind::DropIndex => "drop_index",
            DdlKind::DropTable => "drop_table",
            DdlKind::DropSequence => "drop_sequence",
            DdlKind::InsertDefaultRow => "insert_default_row",
        }
    }

    /// Statements that need `ALTER TABLE ... FOREIGN KEY` support.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, DdlKind::AddForeignKey | DdlKind::DropForeignKey)
    }
}

impl fmt::Display for DdlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdlStatement {
    pub kind: DdlKind,
    /// Table the statement belongs to; the schema name for `CreateSchema`
    pub table: String,
    /// Name of the created or dropped object (index, constraint, sequence)
    pub object: String,
    pub sql: String,
}

impl DdlStatement {
    pub fn new(
        kind: DdlKind,
        table: impl Into<String>,
        object: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            object: object.into(),
            sql: sql.into(),
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.sql)
    }
}
