//! Pseudo Primary Keys
//!
//! A pseudo primary key is a configured list of columns used as row identity
//! for a table that has no genuine primary key metadata (CSV fixtures, query
//! results). Definitions are read once and stay immutable for a comparison.
//!
//! # Properties Format
//! ```text
//! # table=column[,column...]
//! ITEM=sku
//! ORDER_LINE=order_id,line_no
//! ```

use crate::dataset::{Column, TableMetadata};
use crate::error::{DbCompareError, Result};

/// Pseudo primary key definitions, keyed by table name (case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoKeys {
    definitions: Vec<(String, Vec<String>)>,
}

impl PseudoKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the pseudo key of a table
    ///
    /// Column names are trimmed and upper-cased.
    ///
    /// # Errors
    /// Returns `ConfigError` when the table is already declared or the column list is empty.
    pub fn define<I, S>(&mut self, table: &str, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let table = table.trim();
        if self.has_pseudo_key(table) {
            return Err(DbCompareError::config_error(format!(
                "Pseudo primary key for table '{table}' is declared more than once"
            )));
        }

        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        if columns.is_empty() {
            return Err(DbCompareError::config_error(format!(
                "Pseudo primary key for table '{table}' has no column"
            )));
        }

        self.definitions.push((table.to_string(), columns));
        Ok(())
    }

    /// Parse pseudo key definitions from properties text
    ///
    /// # Errors
    /// Returns `ConfigError` for lines without a separator, duplicate tables or empty column lists.
    pub fn from_properties_str(text: &str) -> Result<Self> {
        let mut keys = Self::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (table, columns) = line.split_once(['=', ':']).ok_or_else(|| {
                DbCompareError::config_error(format!(
                    "Invalid pseudo primary key definition at line {}: '{line}' (expected TABLE=col1,col2)",
                    number + 1
                ))
            })?;
            keys.define(table, columns.split(','))?;
        }
        Ok(keys)
    }

    #[must_use]
    pub fn has_pseudo_key(&self, table: &str) -> bool {
        self.columns_for(table).is_some()
    }

    /// Declared (upper-cased) pseudo key columns of a table
    #[must_use]
    pub fn columns_for(&self, table: &str) -> Option<&[String]> {
        self.definitions
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, columns)| columns.as_slice())
    }

    /// Whether a column is part of a table's pseudo key
    #[must_use]
    pub fn is_pseudo_key_column(&self, table: &str, column: &str) -> bool {
        self.columns_for(table).is_some_and(|cols| cols.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.definitions.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Check the table's pseudo key against its actual columns
    ///
    /// A table without a declared pseudo key validates with no columns.
    #[must_use]
    pub fn validate(&self, metadata: &TableMetadata) -> PseudoKeyValidation {
        let mut matching = Vec::new();
        let mut missing = Vec::new();

        for declared in self.columns_for(&metadata.name).unwrap_or_default() {
            match metadata.column(declared) {
                Some(column) => matching.push(column.clone()),
                None => missing.push(declared.clone()),
            }
        }

        PseudoKeyValidation { table: metadata.name.clone(), matching, missing }
    }
}

/// Outcome of checking a pseudo key against a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoKeyValidation {
    table: String,
    matching: Vec<Column>,
    missing: Vec<String>,
}

impl PseudoKeyValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table columns found for the declared pseudo key, in declaration order
    #[must_use]
    pub fn matching_columns(&self) -> &[Column] {
        &self.matching
    }

    /// Declared column names the table does not have
    #[must_use]
    pub fn missing_columns(&self) -> &[String] {
        &self.missing
    }

    #[must_use]
    pub fn into_columns(self) -> Vec<Column> {
        self.matching
    }

    /// Troubleshooting message listing the missing names and the table's actual columns
    #[must_use]
    pub fn not_found_message(&self, actual: &TableMetadata) -> String {
        let missing: Vec<String> = self.missing.iter().map(|c| c.to_lowercase()).collect();
        let columns: Vec<String> = actual.columns.iter().map(|c| c.name.to_lowercase()).collect();
        format!(
            "The column(s) chosen as pseudo primary key for table '{}' cannot be found in the dataset:\n\
             - Pseudo primary key column(s) not found: [{}].\n\
             - Dataset actual column(s): [{}].\n",
            self.table,
            missing.join(", "),
            columns.join(", ")
        )
    }
}
