//! Tables, Columns and Table Metadata

use crate::dataset::value::{DataType, Value};
use crate::error::{DbCompareError, Result};

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Declared type, used to compare the column's values
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type }
    }

    /// Whether this column carries the given name (case-insensitive)
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Table structure: name, ordered columns and genuine primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Table name
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<Column>,

    /// Primary key column names, empty when the source had no key metadata
    pub primary_keys: Vec<String>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { name: name.into(), columns, primary_keys: Vec::new() }
    }

    #[must_use]
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Position of a column, looked up case-insensitively
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.is_named(name))
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn has_primary_keys(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    /// Whether the named column is part of the genuine primary key
    #[must_use]
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Primary key columns that exist in this table, in key order
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<Column> {
        self.primary_keys.iter().filter_map(|k| self.column(k)).cloned().collect()
    }
}

/// A named table of typed rows
///
/// Every row holds exactly one value per column; [`Table::new`] enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    metadata: TableMetadata,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, rejecting rows whose arity differs from the column count
    pub fn new(metadata: TableMetadata, rows: Vec<Vec<Value>>) -> Result<Self> {
        let width = metadata.columns.len();
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(DbCompareError::bad_data(format!(
                "Row {index} of table '{}' has {} value(s) but the table has {width} column(s)",
                metadata.name,
                row.len()
            )));
        }
        Ok(Self { metadata, rows })
    }

    /// Create a table without rows
    #[must_use]
    pub const fn empty(metadata: TableMetadata) -> Self {
        Self { metadata, rows: Vec::new() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub const fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.metadata.columns
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Value of a cell, with the column looked up case-insensitively
    pub fn value(&self, row: usize, column: &str) -> Result<&Value> {
        let col = self.metadata.column_index(column).ok_or_else(|| {
            DbCompareError::bad_data(format!(
                "Column '{column}' not found in table '{}'",
                self.metadata.name
            ))
        })?;
        self.rows.get(row).map(|r| &r[col]).ok_or_else(|| {
            DbCompareError::bad_data(format!(
                "Row {row} out of range for table '{}' ({} row(s))",
                self.metadata.name,
                self.rows.len()
            ))
        })
    }

    /// Copy of this table with lower-cased column and key names
    #[must_use]
    pub fn lower_cased(&self) -> Self {
        let metadata = TableMetadata {
            name: self.metadata.name.clone(),
            columns: self
                .metadata
                .columns
                .iter()
                .map(|c| Column::new(c.name.to_lowercase(), c.data_type))
                .collect(),
            primary_keys: self.metadata.primary_keys.iter().map(|k| k.to_lowercase()).collect(),
        };
        Self { metadata, rows: self.rows.clone() }
    }

    /// Copy of this table keeping only the columns `keep` accepts
    ///
    /// Primary key names that no longer name a kept column are dropped.
    #[must_use]
    pub fn select_columns(&self, mut keep: impl FnMut(&Column) -> bool) -> Self {
        let kept: Vec<usize> = self
            .metadata
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| keep(c))
            .map(|(i, _)| i)
            .collect();

        let columns: Vec<Column> = kept.iter().map(|&i| self.metadata.columns[i].clone()).collect();
        let primary_keys = self
            .metadata
            .primary_keys
            .iter()
            .filter(|k| columns.iter().any(|c| c.is_named(k)))
            .cloned()
            .collect();
        let rows = self.rows.iter().map(|r| kept.iter().map(|&i| r[i].clone()).collect()).collect();

        Self {
            metadata: TableMetadata { name: self.metadata.name.clone(), columns, primary_keys },
            rows,
        }
    }
}
