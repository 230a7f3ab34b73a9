//! Tabular Dataset Model
//!
//! A [`Dataset`] is an ordered set of uniquely named [`Table`]s. Table and column
//! names are case-insensitive for lookup. The comparison core only ever reads
//! datasets; filters and views build new ones.

pub mod table;
pub mod value;

pub use table::{Column, Table, TableMetadata};
pub use value::{DataType, Value};

use crate::error::{DbCompareError, Result};

/// Named collection of tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    tables: Vec<Table>,
}

impl Dataset {
    /// Create a dataset, rejecting duplicate table names
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        let mut dataset = Self::default();
        for table in tables {
            dataset.push(table)?;
        }
        Ok(dataset)
    }

    /// Append a table
    ///
    /// # Errors
    /// Returns `BadData` if a table with the same name (case-insensitive) exists.
    pub fn push(&mut self, table: Table) -> Result<()> {
        if self.contains_table(table.name()) {
            return Err(DbCompareError::bad_data(format!(
                "Duplicate table '{}' in dataset",
                table.name()
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(Table::name).collect()
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}
