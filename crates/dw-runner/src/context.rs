//! Explicit per-run state handed to every unit.

use crate::error::{RunnerError, RunnerResult};
use dw_core::{Layers, Project, RunMode, TableSchema};
use dw_db::Database;
use dw_ddl::AuditValues;
use dw_ledger::{DatasetStats, Ledger, LedgerResult, UnitStatus};
use std::future::Future;

/// Everything a unit may touch during a run.
pub struct RunContext<'a> {
    pub run_id: i64,
    pub mode: RunMode,
    pub project: &'a Project,
    pub db: &'a dyn Database,
    pub ledger: &'a Ledger,
    /// Source system after target overrides
    pub source_system: String,
    /// Run start, `YYYY-MM-DD HH:MM:SS` UTC, stamped into audit columns
    pub load_timestamp: String,
}

impl<'a> RunContext<'a> {
    pub fn layers(&self) -> &'a Layers {
        &self.project.config.layers
    }

    /// Audit column values for rows written to `table`.
    pub fn audit_values(&self, table: &TableSchema) -> AuditValues {
        AuditValues {
            source_system: table
                .source_system
                .clone()
                .unwrap_or_else(|| self.source_system.clone()),
            load_timestamp: self.load_timestamp.clone(),
            operation: "INSERT".to_string(),
        }
    }

    /// Pass a ledger write through, escalating a failure to the fallback log.
    pub fn ledger_write<T>(&self, context: &str, result: LedgerResult<T>) -> RunnerResult<T> {
        result.map_err(|e| {
            self.ledger.escalate(context, &e);
            RunnerError::Ledger(e)
        })
    }

    /// Run `body` as a named sub-step of `unit`, recorded in the step log.
    pub async fn step<T, F>(&self, unit: &str, name: &str, body: F) -> RunnerResult<T>
    where
        F: Future<Output = RunnerResult<T>>,
    {
        let seq = self.ledger_write(
            "start step",
            self.ledger.start_step(self.run_id, unit, name),
        )?;
        let result = body.await;
        let (status, message) = match &result {
            Ok(_) => (UnitStatus::Successful, None),
            Err(e) => (UnitStatus::FinishedWithError, Some(e.to_string())),
        };
        self.ledger_write(
            "finish step",
            self.ledger
                .finish_step(self.run_id, unit, seq, status, message.as_deref()),
        )?;
        result
    }

    /// Record a step that carries only a message, such as a SQL checksum.
    pub fn note(&self, unit: &str, name: &str, message: &str) -> RunnerResult<()> {
        let seq = self.ledger_write("start step", self.ledger.start_step(self.run_id, unit, name))?;
        self.ledger_write(
            "finish step",
            self.ledger
                .finish_step(self.run_id, unit, seq, UnitStatus::Successful, Some(message)),
        )
    }

    /// Count rows and columns of `schema.table` and store them in the ledger.
    pub async fn record_dataset(&self, unit: &str, schema: &str, table: &str) -> RunnerResult<i64> {
        let relation = dw_core::sql_utils::qualify(schema, table);
        let rows = self
            .db
            .query_count(&format!("SELECT * FROM {relation}"))
            .await?;
        let columns = self.db.column_names(schema, table).await?.len();
        let stats = DatasetStats {
            run_id: self.run_id,
            unit_name: unit.to_string(),
            dataset: format!("{schema}.{table}"),
            row_count: i64::try_from(rows).unwrap_or(i64::MAX),
            column_count: i32::try_from(columns).unwrap_or(i32::MAX),
        };
        self.ledger_write("record dataset stats", self.ledger.record_dataset_stats(&stats))?;
        Ok(stats.row_count)
    }
}
