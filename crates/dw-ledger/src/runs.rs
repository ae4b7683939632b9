//! Run lifecycle: create, transition and query runs.

use crate::connection::Ledger;
use crate::error::{LedgerError, LedgerResult, LedgerResultExt};
use crate::records::{NewUnit, RunRecord};
use crate::row_helpers::{now_param, parse_optional_timestamp, parse_timestamp};
use crate::status::{RunStatus, UnitStatus};
use crate::units::insert_unit_rows;
use duckdb::Connection;
use dw_core::{RunMode, StageSet};

const RUN_COLUMNS: &str = "run_id, status, run_mode, stages, rebuild, \
     CAST(started_at AS VARCHAR), CAST(ended_at AS VARCHAR), message";

type RawRun = (
    i64,
    String,
    String,
    String,
    bool,
    String,
    Option<String>,
    Option<String>,
);

fn read_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawRun> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_record(raw: RawRun) -> LedgerResult<RunRecord> {
    let (run_id, status, mode, stages, rebuild, started_at, ended_at, message) = raw;
    Ok(RunRecord {
        run_id,
        status: status.parse()?,
        mode: mode.parse().map_err(|_| LedgerError::InvalidValue {
            column: "executions.run_mode".to_string(),
            value: mode.clone(),
        })?,
        stages: StageSet::parse(&stages).map_err(|_| LedgerError::InvalidValue {
            column: "executions.stages".to_string(),
            value: stages.clone(),
        })?,
        rebuild,
        started_at: parse_timestamp("executions.started_at", &started_at)?,
        ended_at: parse_optional_timestamp("executions.ended_at", ended_at)?,
        message,
    })
}

fn query_runs(
    conn: &Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> LedgerResult<Vec<RunRecord>> {
    let mut stmt = conn.prepare(sql).ledger_context("prepare run query")?;
    let raws = stmt
        .query_map(params, read_raw)
        .ledger_context("query runs")?
        .collect::<Result<Vec<_>, _>>()
        .ledger_context("read run row")?;
    raws.into_iter().map(into_record).collect()
}

impl Ledger {
    /// The most recent run, if any.
    pub fn last_run(&self) -> LedgerResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM dw_ledger.executions ORDER BY run_id DESC LIMIT 1"
        );
        Ok(query_runs(&conn, &sql, &[])?.into_iter().next())
    }

    pub fn get_run(&self, run_id: i64) -> LedgerResult<RunRecord> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RUN_COLUMNS} FROM dw_ledger.executions WHERE run_id = ?");
        query_runs(&conn, &sql, &[&run_id])?
            .into_iter()
            .next()
            .ok_or(LedgerError::RunNotFound { run_id })
    }

    /// Most recent runs first.
    pub fn list_runs(&self, limit: usize) -> LedgerResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM dw_ledger.executions ORDER BY run_id DESC LIMIT ?"
        );
        query_runs(&conn, &sql, &[&limit])
    }

    /// Create a PENDING run with id = previous id + 1 together with its
    /// PENDING unit records, sequence 1..=n.
    ///
    /// Both are written in one transaction: a run never exists without the
    /// schedule it was created for.
    pub fn create_run(
        &self,
        mode: RunMode,
        stages: &StageSet,
        rebuild: bool,
        units: &[NewUnit],
    ) -> LedgerResult<RunRecord> {
        let run_id = self.transaction(|conn| {
            let run_id: i64 = conn
                .query_row(
                    "SELECT COALESCE(MAX(run_id), 0) + 1 FROM dw_ledger.executions",
                    [],
                    |row| row.get(0),
                )
                .ledger_context("next run id")?;
            conn.execute(
                "INSERT INTO dw_ledger.executions (run_id, status, run_mode, stages, rebuild, started_at)
                 VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
                duckdb::params![
                    run_id,
                    RunStatus::Pending.as_str(),
                    mode.as_str(),
                    stages.to_string(),
                    rebuild,
                    now_param(),
                ],
            )
            .ledger_context("insert run")?;
            insert_unit_rows(conn, run_id, units)?;
            Ok(run_id)
        })?;
        log::debug!(
            "Created run {run_id} ({mode}, stages {stages}) with {} unit(s)",
            units.len()
        );
        self.get_run(run_id)
    }

    /// Mark a run RUNNING, clearing any previous end time and message.
    pub fn mark_run_running(&self, run_id: i64) -> LedgerResult<()> {
        self.update_run(run_id, RunStatus::Running, None, false)
    }

    pub fn mark_run_successful(&self, run_id: i64) -> LedgerResult<()> {
        self.update_run(run_id, RunStatus::Successful, None, true)
    }

    /// Mark a run FAILED_WITH_ERROR with the captured trace.
    pub fn mark_run_failed(&self, run_id: i64, message: &str) -> LedgerResult<()> {
        self.update_run(run_id, RunStatus::FailedWithError, Some(message), true)
    }

    /// Resolve a run left RUNNING by a process that is gone.
    ///
    /// The run and every unit still RUNNING become failed with `message`;
    /// the run can then be resumed or discarded like any failed run.
    pub fn mark_run_abandoned(&self, run_id: i64, message: &str) -> LedgerResult<()> {
        let status = self.get_run(run_id)?.status;
        if status != RunStatus::Running {
            return Err(LedgerError::UnexpectedRunStatus {
                run_id,
                status: status.to_string(),
                expected: RunStatus::Running.to_string(),
            });
        }
        let units = self.transaction(|conn| {
            let now = now_param();
            let units = conn
                .execute(
                    "UPDATE dw_ledger.work_units
                     SET status = ?, ended_at = CAST(? AS TIMESTAMP), message = ?
                     WHERE run_id = ? AND status = ?",
                    duckdb::params![
                        UnitStatus::FinishedWithError.as_str(),
                        now,
                        message,
                        run_id,
                        UnitStatus::Running.as_str(),
                    ],
                )
                .ledger_context("fail interrupted units")?;
            conn.execute(
                "UPDATE dw_ledger.executions
                 SET status = ?, message = ?, ended_at = CAST(? AS TIMESTAMP)
                 WHERE run_id = ?",
                duckdb::params![RunStatus::FailedWithError.as_str(), message, now, run_id],
            )
            .ledger_context("fail abandoned run")?;
            Ok(units)
        })?;
        log::warn!(
            "Run {run_id} marked {} ({units} interrupted unit(s))",
            RunStatus::FailedWithError
        );
        Ok(())
    }

    fn update_run(
        &self,
        run_id: i64,
        status: RunStatus,
        message: Option<&str>,
        finished: bool,
    ) -> LedgerResult<()> {
        let conn = self.conn()?;
        let ended_at = finished.then(now_param);
        let updated = conn
            .execute(
                "UPDATE dw_ledger.executions
                 SET status = ?, message = ?, ended_at = CAST(? AS TIMESTAMP)
                 WHERE run_id = ?",
                duckdb::params![status.as_str(), message, ended_at, run_id],
            )
            .ledger_context("update run status")?;
        if updated == 0 {
            return Err(LedgerError::RunNotFound { run_id });
        }
        log::debug!("Run {run_id} -> {status}");
        Ok(())
    }
}

#[cfg(test)]
#[path = "runs_test.rs"]
mod tests;
