//! Database Targets
//!
//! A target reads datasets out of a database and writes them back in.
//!
//! # Stateless Design
//! All trait methods are stateless and take `&ConnectionConfig` as input.
//! Connections are opened, used, and closed within each method call.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::{DbCompareError, Result};
use crate::keys::PseudoKeys;
use crate::operation::DatabaseOperation;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Default table name of a dataset built from a query
pub const DEFAULT_QUERY_TABLE: &str = "default";

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection configuration for a database target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Database file path (for sqlite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self { engine: DatabaseType::SQLite, file: Some(file) }
    }

    /// Parse a `sqlite:PATH` source string
    ///
    /// Returns `None` for anything else (a dataset directory, typically).
    #[must_use]
    pub fn from_source(source: &str) -> Option<Self> {
        source
            .strip_prefix("sqlite:")
            .filter(|path| !path.is_empty())
            .map(|path| Self::sqlite(PathBuf::from(path)))
    }

    /// The database file, checked against the expected engine
    ///
    /// # Errors
    /// Returns `InvalidInput` for another engine, a missing file parameter or
    /// a non UTF-8 path.
    pub fn file_for(&self, engine: DatabaseType) -> Result<&str> {
        if self.engine != engine {
            return Err(DbCompareError::invalid_input(format!(
                "Expected {engine} engine, got {}",
                self.engine
            )));
        }
        let file: &Path = self.file.as_deref().ok_or_else(|| {
            DbCompareError::invalid_input(format!("{engine} requires 'file' parameter"))
        })?;
        file.to_str().ok_or_else(|| {
            DbCompareError::invalid_input(format!(
                "{engine} file path contains invalid UTF-8 characters"
            ))
        })
    }
}

/// A database datasets are read from and written to
///
/// Implementations are stateless: each call opens its own connection.
pub trait DatasetTarget {
    /// Read tables (all user tables when `tables` is `None`) with their
    /// column types and genuine primary keys
    fn dump(config: &ConnectionConfig, tables: Option<&[String]>) -> Result<Dataset>;

    /// Run a read-only query and return its result as a one-table dataset
    fn query(config: &ConnectionConfig, sql: &str, table_name: &str) -> Result<Dataset>;

    /// Run a SQL script
    fn execute_script(config: &ConnectionConfig, script: &str) -> Result<()>;

    /// Apply `operation` with the rows of `dataset`, in one transaction
    ///
    /// Keyed operations use the database's primary keys, falling back to
    /// `pseudo_keys`. Returns the number of affected rows.
    fn apply(
        config: &ConnectionConfig,
        dataset: &Dataset,
        operation: DatabaseOperation,
        pseudo_keys: Option<&PseudoKeys>,
    ) -> Result<usize>;
}
