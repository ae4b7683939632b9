//! An ordered list of DDL statements.

use crate::statement::{DdlKind, DdlStatement};
use serde::Serialize;

/// Ordered DDL, executed front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DdlPlan {
    statements: Vec<DdlStatement>,
}

impl DdlPlan {
    pub fn new(statements: Vec<DdlStatement>) -> Self {
        Self { statements }
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = DdlStatement>) {
        self.statements.extend(statements);
    }

    pub fn statements(&self) -> &[DdlStatement] {
        &self.statements
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DdlStatement> + ExactSizeIterator {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Position of the first statement matching `kind` on `table`.
    pub fn position(&self, kind: DdlKind, table: &str) -> Option<usize> {
        self.statements
            .iter()
            .position(|s| s.kind == kind && s.table == table)
    }

    /// Number of statements of each kind, in first-appearance order.
    pub fn kind_counts(&self) -> Vec<(DdlKind, usize)> {
        let mut counts: Vec<(DdlKind, usize)> = Vec::new();
        for stmt in &self.statements {
            match counts.iter_mut().find(|(k, _)| *k == stmt.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((stmt.kind, 1)),
            }
        }
        counts
    }

    /// The plan as a SQL script, one statement per paragraph.
    ///
    /// Statements the target backend will skip are kept, commented out, when
    /// `skip_foreign_keys` is set.
    pub fn render(&self, skip_foreign_keys: bool) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            if skip_foreign_keys && stmt.kind.is_foreign_key() {
                out.push_str("-- skipped: backend lacks ALTER TABLE ... FOREIGN KEY\n");
                for line in stmt.sql.lines() {
                    out.push_str("-- ");
                    out.push_str(line);
                    out.push('\n');
                }
            } else {
                out.push_str(&stmt.to_string());
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a DdlPlan {
    type Item = &'a DdlStatement;
    type IntoIter = std::slice::Iter<'a, DdlStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
