//! Timestamp and label conversions between Rust and ledger columns.
//!
//! Timestamps are written as naive UTC text cast to TIMESTAMP and read back
//! through `CAST(... AS VARCHAR)`, so no driver-level chrono support is needed.

use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render a timestamp for `CAST(? AS TIMESTAMP)`.
pub(crate) fn to_sql_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Current time as a SQL timestamp parameter.
pub(crate) fn now_param() -> String {
    to_sql_timestamp(Utc::now())
}

/// Parse a timestamp read back as VARCHAR.
pub(crate) fn parse_timestamp(column: &str, value: &str) -> LedgerResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| LedgerError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
        })
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> LedgerResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(column, &v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("t", "2024-03-01 10:15:30.123456").unwrap();
        assert_eq!(to_sql_timestamp(ts), "2024-03-01 10:15:30.123456");
    }

    #[test]
    fn test_timestamp_without_fraction() {
        let ts = parse_timestamp("t", "2024-03-01 10:15:30").unwrap();
        assert_eq!(to_sql_timestamp(ts), "2024-03-01 10:15:30.000000");
    }

    #[test]
    fn test_bad_timestamp() {
        assert!(parse_timestamp("t", "yesterday").is_err());
    }
}
