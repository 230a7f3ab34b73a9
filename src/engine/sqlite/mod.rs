//! `SQLite` Dataset Target
//!
//! Implements [`DatasetTarget`] for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/db.sqlite`)
//! - Table dumps typed from declared column types, with primary keys from `PRAGMA table_info`
//! - Read-only queries loaded as one-table datasets
//! - Scripts and dataset-driven operations, the latter in a single transaction
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver)
//! - BLOB cells load as binary values; dates and times are written back as text

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, Row, ToSql};
use tracing::{debug, info};

use crate::dataset::{Column, DataType, Dataset, Table, TableMetadata, Value};
use crate::engine::{ConnectionConfig, DatabaseType, DatasetTarget};
use crate::error::{DbCompareError, Result};
use crate::keys::PseudoKeys;
use crate::operation::{quote_identifier, validate_query, DatabaseOperation, Sql, Statement};

/// `SQLite` dataset target
pub struct SqliteTarget;

impl DatasetTarget for SqliteTarget {
    fn dump(config: &ConnectionConfig, tables: Option<&[String]>) -> Result<Dataset> {
        let conn = open_connection(config.file_for(DatabaseType::SQLite)?, true)?;

        let existing = table_names(&conn)?;
        let selected = match tables {
            None => existing,
            Some(requested) => requested
                .iter()
                .map(|name| {
                    existing.iter().find(|t| t.eq_ignore_ascii_case(name)).cloned().ok_or_else(
                        || DbCompareError::invalid_input(format!("Table '{name}' not found")),
                    )
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let mut dataset = Dataset::default();
        for name in selected {
            let metadata = table_metadata(&conn, &name)?;
            let sql = format!(
                "SELECT {} FROM {}",
                metadata.columns.iter().map(|c| quote_identifier(&c.name)).collect::<Vec<_>>().join(", "),
                quote_identifier(&name)
            );
            let rows = fetch_rows(&conn, &sql, metadata.columns.len())?;
            debug!(table = %name, rows = rows.len(), "Dumped table");
            dataset.push(Table::new(metadata, rows)?)?;
        }
        Ok(dataset)
    }

    fn query(config: &ConnectionConfig, sql: &str, table_name: &str) -> Result<Dataset> {
        validate_query(sql)?;
        let conn = open_connection(config.file_for(DatabaseType::SQLite)?, true)?;

        let columns: Vec<Column> = {
            let stmt = conn
                .prepare(sql)
                .map_err(|e| DbCompareError::query_failed(format!("Failed to prepare query: {e}")))?;
            stmt.column_names().iter().map(|name| Column::new(*name, DataType::Unknown)).collect()
        };
        let rows = fetch_rows(&conn, sql, columns.len())?;

        Dataset::new(vec![Table::new(TableMetadata::new(table_name, columns), rows)?])
    }

    fn execute_script(config: &ConnectionConfig, script: &str) -> Result<()> {
        let conn = open_connection(config.file_for(DatabaseType::SQLite)?, false)?;
        conn.execute_batch(script)
            .map_err(|e| DbCompareError::query_failed(format!("Failed to execute script: {e}")))
    }

    fn apply(
        config: &ConnectionConfig,
        dataset: &Dataset,
        operation: DatabaseOperation,
        pseudo_keys: Option<&PseudoKeys>,
    ) -> Result<usize> {
        let mut conn = open_connection(config.file_for(DatabaseType::SQLite)?, false)?;

        let statements = operation.plan(dataset, |table| {
            let genuine = table_metadata(&conn, table.name())?.primary_keys;
            if !genuine.is_empty() {
                return Ok(genuine);
            }
            Ok(pseudo_keys.and_then(|keys| keys.columns_for(table.name())).unwrap_or_default().to_vec())
        })?;

        let tx = conn.transaction().map_err(|e| {
            DbCompareError::engine_error("sqlite", format!("Failed to begin transaction: {e}"))
        })?;

        let mut affected = 0;
        for statement in &statements {
            affected += match statement {
                Statement::Execute(sql) => run(&tx, sql)?,
                Statement::UpdateOrInsert { update, insert } => match run(&tx, update)? {
                    0 => run(&tx, insert)?,
                    updated => updated,
                },
            };
        }

        tx.commit().map_err(|e| {
            DbCompareError::engine_error("sqlite", format!("Failed to commit transaction: {e}"))
        })?;

        info!(operation = %operation, statements = statements.len(), affected, "Applied dataset");
        Ok(affected)
    }
}

/// Open `SQLite` connection with appropriate flags
fn open_connection(path: &str, read_only: bool) -> Result<Connection> {
    let flags = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };

    Connection::open_with_flags(path, flags).map_err(|e| {
        DbCompareError::connection_failed(format!("Failed to open SQLite database {path}: {e}"))
    })
}

/// User tables, sorted by name
fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table'
             AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(|e| DbCompareError::engine_error("sqlite", format!("Failed to query tables: {e}")))?;

    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| {
            DbCompareError::engine_error("sqlite", format!("Failed to fetch table names: {e}"))
        })?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| {
            DbCompareError::engine_error("sqlite", format!("Failed to collect table names: {e}"))
        });
    names
}

/// Columns and primary key of a table via `PRAGMA table_info`
fn table_metadata(conn: &Connection, table_name: &str) -> Result<TableMetadata> {
    let mut stmt =
        conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table_name))).map_err(|e| {
            DbCompareError::engine_error(
                "sqlite",
                format!("Failed to prepare table_info for {table_name}: {e}"),
            )
        })?;

    let info: Vec<(String, String, i32)> = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: Option<String> = row.get(2)?;
            let pk: i32 = row.get(5)?; // pk column: >0 is the position in the primary key
            Ok((name, declared.unwrap_or_default(), pk))
        })
        .map_err(|e| {
            DbCompareError::engine_error(
                "sqlite",
                format!("Failed to query columns for {table_name}: {e}"),
            )
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            DbCompareError::engine_error(
                "sqlite",
                format!("Failed to collect columns for {table_name}: {e}"),
            )
        })?;

    if info.is_empty() {
        return Err(DbCompareError::invalid_input(format!("Table '{table_name}' not found")));
    }

    let mut keys: Vec<(i32, &str)> =
        info.iter().filter(|(_, _, pk)| *pk > 0).map(|(name, _, pk)| (*pk, name.as_str())).collect();
    keys.sort_by_key(|(pk, _)| *pk);
    let primary_keys: Vec<String> = keys.into_iter().map(|(_, name)| name.to_string()).collect();

    let columns = info
        .iter()
        .map(|(name, declared, _)| Column::new(name.clone(), DataType::from_sql_type(declared)))
        .collect();

    Ok(TableMetadata::new(table_name, columns).with_primary_keys(primary_keys))
}

fn fetch_rows(conn: &Connection, sql: &str, width: usize) -> Result<Vec<Vec<Value>>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DbCompareError::query_failed(format!("Failed to prepare query: {e}")))?;

    let rows = stmt
        .query([])
        .map_err(|e| DbCompareError::query_failed(format!("Failed to execute query: {e}")))?;

    rows.mapped(|row| row_values(row, width))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DbCompareError::query_failed(format!("Failed to fetch row: {e}")))
}

fn row_values(row: &Row, width: usize) -> std::result::Result<Vec<Value>, rusqlite::Error> {
    (0..width).map(|idx| sqlite_value(row, idx)).collect()
}

/// Convert a `SQLite` cell to a dataset value
fn sqlite_value(row: &Row, idx: usize) -> std::result::Result<Value, rusqlite::Error> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Decimal(f),
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Value::Text(text.to_string())
        }
        ValueRef::Blob(b) => Value::Binary(b.to_vec()),
    })
}

fn run(conn: &Connection, sql: &Sql) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached(&sql.text)
        .map_err(|e| DbCompareError::query_failed(format!("Failed to prepare '{}': {e}", sql.text)))?;
    stmt.execute(params_from_iter(sql.params.iter()))
        .map_err(|e| DbCompareError::query_failed(format!("Failed to execute '{}': {e}", sql.text)))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Decimal(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Self::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Binary(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            temporal @ (Self::Date(_) | Self::Time(_) | Self::Timestamp(_)) => {
                ToSqlOutput::Owned(SqlValue::Text(temporal.to_string()))
            }
        })
    }
}
