//! Work unit records of a run.

use crate::connection::Ledger;
use crate::error::{LedgerError, LedgerResult, LedgerResultExt};
use crate::records::{NewUnit, UnitRecord};
use crate::row_helpers::{now_param, parse_optional_timestamp};
use crate::status::UnitStatus;
use duckdb::Connection;
use dw_core::{Stage, UnitName};

type RawUnit = (
    i64,
    String,
    i32,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn into_record(raw: RawUnit) -> LedgerResult<UnitRecord> {
    let (run_id, name, sequence, stage, status, started_at, ended_at, message) = raw;
    Ok(UnitRecord {
        run_id,
        name: UnitName::try_new(name.clone()).ok_or(LedgerError::InvalidValue {
            column: "work_units.unit_name".to_string(),
            value: name,
        })?,
        sequence,
        stage: stage.parse::<Stage>().map_err(|_| LedgerError::InvalidValue {
            column: "work_units.stage".to_string(),
            value: stage.clone(),
        })?,
        status: status.parse()?,
        started_at: parse_optional_timestamp("work_units.started_at", started_at)?,
        ended_at: parse_optional_timestamp("work_units.ended_at", ended_at)?,
        message,
    })
}

/// Insert the schedule of a run as PENDING records, sequence 1..=n.
pub(crate) fn insert_unit_rows(
    conn: &Connection,
    run_id: i64,
    units: &[NewUnit],
) -> LedgerResult<()> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO dw_ledger.work_units (run_id, unit_name, sequence, stage, status)
             VALUES (?, ?, ?, ?, ?)",
        )
        .ledger_context("prepare unit insert")?;
    for (i, unit) in units.iter().enumerate() {
        let sequence = i32::try_from(i + 1)
            .map_err(|_| LedgerError::QueryError(format!("too many units in run {run_id}")))?;
        stmt.execute(duckdb::params![
            run_id,
            unit.name.as_str(),
            sequence,
            unit.stage.as_str(),
            UnitStatus::Pending.as_str(),
        ])
        .ledger_context("insert work unit")?;
    }
    Ok(())
}

impl Ledger {
    /// Every unit of a run, ordered by sequence.
    pub fn units(&self, run_id: i64) -> LedgerResult<Vec<UnitRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, unit_name, sequence, stage, status,
                        CAST(started_at AS VARCHAR), CAST(ended_at AS VARCHAR), message
                 FROM dw_ledger.work_units WHERE run_id = ? ORDER BY sequence",
            )
            .ledger_context("prepare unit query")?;
        let raws = stmt
            .query_map(duckdb::params![run_id], |row| {
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
            })
            .ledger_context("query units")?
            .collect::<Result<Vec<RawUnit>, _>>()
            .ledger_context("read unit row")?;
        raws.into_iter().map(into_record).collect()
    }

    /// Mark a unit RUNNING with a fresh start time, clearing a previous attempt.
    pub fn mark_unit_running(&self, run_id: i64, unit: &str) -> LedgerResult<()> {
        self.update_unit(
            run_id,
            unit,
            "UPDATE dw_ledger.work_units
             SET status = ?, started_at = CAST(? AS TIMESTAMP), ended_at = NULL, message = NULL
             WHERE run_id = ? AND unit_name = ?",
            UnitStatus::Running,
            None,
        )
    }

    pub fn mark_unit_successful(&self, run_id: i64, unit: &str) -> LedgerResult<()> {
        self.update_unit(
            run_id,
            unit,
            "UPDATE dw_ledger.work_units
             SET status = ?, ended_at = CAST(? AS TIMESTAMP)
             WHERE run_id = ? AND unit_name = ?",
            UnitStatus::Successful,
            None,
        )
    }

    /// Mark a unit FINISHED_WITH_ERROR with the captured trace.
    pub fn mark_unit_failed(&self, run_id: i64, unit: &str, message: &str) -> LedgerResult<()> {
        self.update_unit(
            run_id,
            unit,
            "UPDATE dw_ledger.work_units
             SET status = ?, ended_at = CAST(? AS TIMESTAMP), message = ?
             WHERE run_id = ? AND unit_name = ?",
            UnitStatus::FinishedWithError,
            Some(message),
        )
    }

    fn update_unit(
        &self,
        run_id: i64,
        unit: &str,
        sql: &str,
        status: UnitStatus,
        message: Option<&str>,
    ) -> LedgerResult<()> {
        let conn = self.conn()?;
        let now = now_param();
        let updated = match message {
            Some(msg) => {
                conn.execute(sql, duckdb::params![status.as_str(), now, msg, run_id, unit])
            }
            None => conn.execute(sql, duckdb::params![status.as_str(), now, run_id, unit]),
        }
        .ledger_context("update unit status")?;
        if updated == 0 {
            return Err(LedgerError::UnitNotFound {
                run_id,
                unit: unit.to_string(),
            });
        }
        log::debug!("Unit {unit} (run {run_id}) -> {status}");
        Ok(())
    }
}

#[cfg(test)]
#[path = "units_test.rs"]
mod tests;
