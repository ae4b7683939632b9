//! Unit sub-steps and dataset statistics.

use crate::connection::Ledger;
use crate::error::{LedgerError, LedgerResult, LedgerResultExt};
use crate::records::{DatasetStats, StepRecord};
use crate::row_helpers::{now_param, parse_optional_timestamp, parse_timestamp};
use crate::status::UnitStatus;

impl Ledger {
    /// Record the start of a named step; returns its sequence within the unit.
    pub fn start_step(&self, run_id: i64, unit: &str, step_name: &str) -> LedgerResult<i32> {
        self.transaction(|conn| {
            let step_seq: i32 = conn
                .query_row(
                    "SELECT CAST(COALESCE(MAX(step_seq), 0) + 1 AS INTEGER)
                     FROM dw_ledger.unit_steps WHERE run_id = ? AND unit_name = ?",
                    duckdb::params![run_id, unit],
                    |row| row.get(0),
                )
                .ledger_context("next step sequence")?;
            conn.execute(
                "INSERT INTO dw_ledger.unit_steps (run_id, unit_name, step_seq, step_name, status, started_at)
                 VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
                duckdb::params![
                    run_id,
                    unit,
                    step_seq,
                    step_name,
                    UnitStatus::Running.as_str(),
                    now_param(),
                ],
            )
            .ledger_context("insert unit step")?;
            Ok(step_seq)
        })
    }

    /// Close a step as SUCCESSFUL or FINISHED_WITH_ERROR.
    pub fn finish_step(
        &self,
        run_id: i64,
        unit: &str,
        step_seq: i32,
        status: UnitStatus,
        message: Option<&str>,
    ) -> LedgerResult<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE dw_ledger.unit_steps
                 SET status = ?, ended_at = CAST(? AS TIMESTAMP), message = ?
                 WHERE run_id = ? AND unit_name = ? AND step_seq = ?",
                duckdb::params![status.as_str(), now_param(), message, run_id, unit, step_seq],
            )
            .ledger_context("update unit step")?;
        if updated == 0 {
            return Err(LedgerError::UnitNotFound {
                run_id,
                unit: format!("{unit} (step {step_seq})"),
            });
        }
        Ok(())
    }

    /// Steps of a run, ordered by unit sequence then step order.
    pub fn steps(&self, run_id: i64) -> LedgerResult<Vec<StepRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT s.run_id, s.unit_name, s.step_seq, s.step_name, s.status,
                        CAST(s.started_at AS VARCHAR), CAST(s.ended_at AS VARCHAR), s.message
                 FROM dw_ledger.unit_steps s
                 LEFT JOIN dw_ledger.work_units u
                   ON u.run_id = s.run_id AND u.unit_name = s.unit_name
                 WHERE s.run_id = ?
                 ORDER BY u.sequence NULLS LAST, s.unit_name, s.step_seq",
            )
            .ledger_context("prepare step query")?;
        let raws = stmt
            .query_map(duckdb::params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })
            .ledger_context("query steps")?
            .collect::<Result<Vec<_>, _>>()
            .ledger_context("read step row")?;

        raws.into_iter()
            .map(
                |(run_id, unit_name, step_seq, step_name, status, started, ended, message)| {
                    Ok(StepRecord {
                        run_id,
                        unit_name,
                        step_seq,
                        step_name,
                        status: status.parse()?,
                        started_at: parse_timestamp("unit_steps.started_at", &started)?,
                        ended_at: parse_optional_timestamp("unit_steps.ended_at", ended)?,
                        message,
                    })
                },
            )
            .collect()
    }

    /// Record the size of a dataset a unit wrote.
    pub fn record_dataset_stats(&self, stats: &DatasetStats) -> LedgerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO dw_ledger.dataset_stats (run_id, unit_name, dataset, row_count, column_count, recorded_at)
             VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            duckdb::params![
                stats.run_id,
                stats.unit_name,
                stats.dataset,
                stats.row_count,
                stats.column_count,
                now_param(),
            ],
        )
        .ledger_context("insert dataset stats")?;
        Ok(())
    }

    /// Dataset statistics of a run, in recording order.
    pub fn dataset_stats(&self, run_id: i64) -> LedgerResult<Vec<DatasetStats>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, unit_name, dataset, row_count, column_count
                 FROM dw_ledger.dataset_stats WHERE run_id = ?
                 ORDER BY recorded_at, unit_name, dataset",
            )
            .ledger_context("prepare dataset stats query")?;
        let rows = stmt
            .query_map(duckdb::params![run_id], |row| {
                Ok(DatasetStats {
                    run_id: row.get(0)?,
                    unit_name: row.get(1)?,
                    dataset: row.get(2)?,
                    row_count: row.get(3)?,
                    column_count: row.get(4)?,
                })
            })
            .ledger_context("query dataset stats")?
            .collect::<Result<Vec<_>, _>>()
            .ledger_context("read dataset stats row")?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "steps_test.rs"]
mod tests;
