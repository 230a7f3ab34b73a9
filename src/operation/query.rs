//! Dataset Query Validation
//!
//! A query turned into a dataset must be a single read-only statement:
//! `SELECT`, `WITH` or `PRAGMA`, optionally prefixed by `EXPLAIN`.

use crate::error::{DbCompareError, Result};

/// Check that `sql` can be loaded as a dataset
pub fn validate_query(sql: &str) -> Result<()> {
    let processed = preprocess_sql(sql)?;
    if is_read_only(&processed) {
        Ok(())
    } else {
        Err(DbCompareError::invalid_input(format!(
            "Only SELECT, WITH and PRAGMA statements can be loaded as a dataset:\n\n{sql}"
        )))
    }
}

/// Trim, strip comments, reject multiple statements and upper-case
fn preprocess_sql(sql: &str) -> Result<String> {
    let processed = strip_comments(sql.trim());
    let processed = processed.trim();
    if processed.is_empty() {
        return Err(DbCompareError::invalid_input("Query cannot be empty"));
    }

    if processed.trim_end_matches(';').trim().contains(';') {
        return Err(DbCompareError::invalid_input(
            "A dataset query must be a single statement",
        ));
    }

    Ok(processed.to_uppercase())
}

/// Remove `--` line comments and `/* */` block comments
pub(crate) fn strip_comments(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

fn is_read_only(sql: &str) -> bool {
    let sql = sql.strip_prefix("EXPLAIN QUERY PLAN").or_else(|| sql.strip_prefix("EXPLAIN")).unwrap_or(sql);
    let sql = sql.trim_start();

    ["SELECT", "WITH", "PRAGMA"].iter().any(|keyword| {
        sql.strip_prefix(keyword)
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace() || c == '*'))
    })
}
