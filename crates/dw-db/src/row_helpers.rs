//! Helpers for reading DuckDB row values as text.

use duckdb::types::Value;

/// Render a DuckDB value as text, `None` for NULL.
///
/// Callers that need a specific textual form (timestamps, decimals) cast to
/// VARCHAR in SQL; the fallback arm only guards against exotic types.
pub(crate) fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Boolean(b) => Some(b.to_string()),
        Value::TinyInt(n) => Some(n.to_string()),
        Value::SmallInt(n) => Some(n.to_string()),
        Value::Int(n) => Some(n.to_string()),
        Value::BigInt(n) => Some(n.to_string()),
        Value::HugeInt(n) => Some(n.to_string()),
        Value::UTinyInt(n) => Some(n.to_string()),
        Value::USmallInt(n) => Some(n.to_string()),
        Value::UInt(n) => Some(n.to_string()),
        Value::UBigInt(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Enum(s) => Some(s),
        other => Some(format!("{other:?}")),
    }
}

/// Interpret a DuckDB value as an integer, if it is one.
pub(crate) fn value_to_i64(value: Value) -> Option<i64> {
    match value {
        Value::TinyInt(n) => Some(i64::from(n)),
        Value::SmallInt(n) => Some(i64::from(n)),
        Value::Int(n) => Some(i64::from(n)),
        Value::BigInt(n) => Some(n),
        Value::HugeInt(n) => i64::try_from(n).ok(),
        Value::UTinyInt(n) => Some(i64::from(n)),
        Value::USmallInt(n) => Some(i64::from(n)),
        Value::UInt(n) => Some(i64::from(n)),
        Value::UBigInt(n) => i64::try_from(n).ok(),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read every column of a row as text.
pub(crate) fn read_row(row: &duckdb::Row<'_>) -> duckdb::Result<Vec<Option<String>>> {
    let col_count = row.as_ref().column_count();
    (0..col_count)
        .map(|i| row.get::<_, Value>(i).map(value_to_string))
        .collect()
}
