//! Dataset-Driven Database Operations
//!
//! A [`DatabaseOperation`] says what to do with a dataset's rows in the target
//! database. [`DatabaseOperation::plan`] turns a dataset into the ordered,
//! parameterised statements an engine then runs in one transaction.
//!
//! # Operations
//! - `INSERT`: insert every row
//! - `UPDATE`: update every row by key
//! - `DELETE`: delete every row by key
//! - `DELETE_ALL`: empty every table of the dataset
//! - `TRUNCATE_TABLE`: same as `DELETE_ALL`
//! - `REFRESH`: update every row by key, inserting it when absent
//! - `CLEAN_INSERT`: `DELETE_ALL` then `INSERT`
//! - `NONE`: nothing
//!
//! Deletions run over the tables in reverse dataset order, so child tables
//! listed after their parents are emptied first.

pub mod query;

pub use query::validate_query;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Table, Value};
use crate::error::{DbCompareError, Result};

/// What to do with a dataset in the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseOperation {
    Update,
    Insert,
    Delete,
    DeleteAll,
    TruncateTable,
    Refresh,
    CleanInsert,
    None,
}

impl DatabaseOperation {
    /// Parse an operation name
    ///
    /// Names are case-insensitive and may carry a dotted prefix
    /// (`org.example.DELETE_ALL`), of which only the last segment counts.
    ///
    /// # Errors
    /// Returns `ConfigError` for unknown names.
    pub fn parse(name: &str) -> Result<Self> {
        let short = name.trim().rsplit('.').next().unwrap_or_default();
        match short.to_uppercase().as_str() {
            "UPDATE" => Ok(Self::Update),
            "INSERT" => Ok(Self::Insert),
            "DELETE" => Ok(Self::Delete),
            "DELETE_ALL" => Ok(Self::DeleteAll),
            "TRUNCATE_TABLE" => Ok(Self::TruncateTable),
            "REFRESH" => Ok(Self::Refresh),
            "CLEAN_INSERT" => Ok(Self::CleanInsert),
            "NONE" => Ok(Self::None),
            _ => Err(DbCompareError::config_error(format!(
                "Unknown database operation '{name}'. Operation must be one of: UPDATE, INSERT, DELETE, DELETE_ALL, TRUNCATE_TABLE, REFRESH, CLEAN_INSERT, NONE"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "UPDATE",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::DeleteAll => "DELETE_ALL",
            Self::TruncateTable => "TRUNCATE_TABLE",
            Self::Refresh => "REFRESH",
            Self::CleanInsert => "CLEAN_INSERT",
            Self::None => "NONE",
        }
    }

    /// Restrict to the operations a delete command accepts
    ///
    /// # Errors
    /// Returns `ConfigError` unless the operation is `DELETE` or `DELETE_ALL`.
    pub fn for_delete(self) -> Result<Self> {
        match self {
            Self::Delete | Self::DeleteAll => Ok(self),
            other => Err(DbCompareError::config_error(format!(
                "Illegal delete operation '{}'. Operation must be one of: 'DELETE', 'DELETE_ALL'",
                other.as_str()
            ))),
        }
    }

    /// Whether rows are addressed by key
    #[must_use]
    pub const fn needs_keys(&self) -> bool {
        matches!(self, Self::Update | Self::Delete | Self::Refresh)
    }

    /// Plan the statements for `dataset`
    ///
    /// `key_for` gives the key column names of a table; it is only called
    /// for operations that address rows by key.
    ///
    /// # Errors
    /// Returns `InvalidInput` when a keyed operation meets a table without
    /// key, or a key column the table does not have.
    pub fn plan<F>(&self, dataset: &Dataset, mut key_for: F) -> Result<Vec<Statement>>
    where
        F: FnMut(&Table) -> Result<Vec<String>>,
    {
        let mut statements = Vec::new();
        let reversed = || dataset.tables().iter().rev();

        match self {
            Self::None => {}
            Self::Insert => {
                for table in dataset.tables() {
                    statements.extend(insert_rows(table));
                }
            }
            Self::DeleteAll | Self::TruncateTable => {
                statements.extend(reversed().map(delete_all));
            }
            Self::CleanInsert => {
                statements.extend(reversed().map(delete_all));
                for table in dataset.tables() {
                    statements.extend(insert_rows(table));
                }
            }
            Self::Update | Self::Refresh => {
                for table in dataset.tables() {
                    let key = resolve_key(self, table, &mut key_for)?;
                    for row in 0..table.row_count() {
                        let update = update_row(table, row, &key);
                        statements.push(if *self == Self::Refresh {
                            Statement::UpdateOrInsert { update, insert: insert_row(table, row) }
                        } else {
                            Statement::Execute(update)
                        });
                    }
                }
            }
            Self::Delete => {
                for table in reversed() {
                    let key = resolve_key(self, table, &mut key_for)?;
                    for row in 0..table.row_count() {
                        statements.push(Statement::Execute(delete_row(table, row, &key)));
                    }
                }
            }
        }

        Ok(statements)
    }
}

impl std::fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// SQL text with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    pub text: String,
    pub params: Vec<Value>,
}

impl Sql {
    fn new(text: String, params: Vec<Value>) -> Self {
        Self { text, params }
    }
}

/// One planned step
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Execute(Sql),

    /// Run `update`; run `insert` when it changed no row
    UpdateOrInsert { update: Sql, insert: Sql },
}

/// Quote an identifier for SQL
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Key column positions of `table`, as given by `key_for`
fn resolve_key<F>(operation: &DatabaseOperation, table: &Table, key_for: &mut F) -> Result<Vec<usize>>
where
    F: FnMut(&Table) -> Result<Vec<String>>,
{
    let names = key_for(table)?;
    if names.is_empty() {
        return Err(DbCompareError::invalid_input(format!(
            "{operation} needs a primary key but table '{}' has none (declare a pseudo primary key)",
            table.name()
        )));
    }
    names
        .iter()
        .map(|name| {
            table.metadata().column_index(name).ok_or_else(|| {
                DbCompareError::invalid_input(format!(
                    "Key column '{name}' not found in table '{}'",
                    table.name()
                ))
            })
        })
        .collect()
}

fn column_list(table: &Table) -> String {
    table.columns().iter().map(|c| quote_identifier(&c.name)).collect::<Vec<_>>().join(", ")
}

fn insert_row(table: &Table, row: usize) -> Sql {
    let placeholders = vec!["?"; table.columns().len()].join(", ");
    Sql::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_identifier(table.name()),
            column_list(table)
        ),
        table.rows()[row].clone(),
    )
}

fn insert_rows(table: &Table) -> impl Iterator<Item = Statement> + '_ {
    (0..table.row_count()).map(move |row| Statement::Execute(insert_row(table, row)))
}

fn delete_all(table: &Table) -> Statement {
    Statement::Execute(Sql::new(format!("DELETE FROM {}", quote_identifier(table.name())), Vec::new()))
}

fn where_clause(table: &Table, row: usize, key: &[usize]) -> (String, Vec<Value>) {
    let clause = key
        .iter()
        .map(|&i| format!("{} = ?", quote_identifier(&table.columns()[i].name)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let params = key.iter().map(|&i| table.rows()[row][i].clone()).collect();
    (clause, params)
}

fn update_row(table: &Table, row: usize, key: &[usize]) -> Sql {
    let assigned: Vec<usize> = (0..table.columns().len()).filter(|i| !key.contains(i)).collect();
    let (clause, key_params) = where_clause(table, row, key);

    // A table made only of key columns still gets a valid statement
    let set = if assigned.is_empty() {
        key.iter().map(|&i| {
            let name = quote_identifier(&table.columns()[i].name);
            format!("{name} = {name}")
        })
        .collect::<Vec<_>>()
        .join(", ")
    } else {
        assigned
            .iter()
            .map(|&i| format!("{} = ?", quote_identifier(&table.columns()[i].name)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut params: Vec<Value> = assigned.iter().map(|&i| table.rows()[row][i].clone()).collect();
    params.extend(key_params);
    Sql::new(format!("UPDATE {} SET {set} WHERE {clause}", quote_identifier(table.name())), params)
}

fn delete_row(table: &Table, row: usize, key: &[usize]) -> Sql {
    let (clause, params) = where_clause(table, row, key);
    Sql::new(format!("DELETE FROM {} WHERE {clause}", quote_identifier(table.name())), params)
}
