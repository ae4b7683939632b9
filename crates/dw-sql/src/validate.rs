//! Single-query validation of rendered SQL.

use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

/// Parse rendered SQL and require exactly one query statement.
///
/// `step` names the SQL in error messages.
pub fn validate_query(step: &str, sql: &str) -> SqlResult<Statement> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SqlError::EmptySql(step.to_string()));
    }

    let statements = Parser::parse_sql(&DuckDbDialect {}, sql).map_err(|e| {
        let message = e.to_string();
        let (line, column) = parse_location_from_error(&message);
        SqlError::ParseError {
            step: step.to_string(),
            message,
            line,
            column,
        }
    })?;

    let count = statements.len();
    let mut statements = statements.into_iter();
    match (statements.next(), count) {
        (None, _) => Err(SqlError::EmptySql(step.to_string())),
        (Some(stmt @ Statement::Query(_)), 1) => Ok(stmt),
        (Some(_), n) if n > 1 => Err(SqlError::MultipleStatements {
            step: step.to_string(),
            count: n,
        }),
        (Some(_), _) => Err(SqlError::NotAQuery {
            step: step.to_string(),
            kind: leading_keyword(sql),
        }),
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(str::to_uppercase)
        .unwrap_or_default()
}

/// Extract "Line: N, Column: M" from a sqlparser error message.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx].trim().parse::<usize>() else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (line, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let column = msg[col_start..col_end].parse::<usize>().unwrap_or(0);
    (line, column)
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
