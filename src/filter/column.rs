//! Column Filters

use regex::Regex;

use crate::dataset::{Column, DataType};
use crate::error::{DbCompareError, Result};
use crate::filter::table::full_match_regex;

/// Include/exclude column regexes applying to tables matched by one table regex
#[derive(Debug, Clone)]
pub struct ColumnRules {
    table_pattern: String,
    table: Regex,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ColumnRules {
    /// # Errors
    /// Returns `ConfigError` if the table pattern is not a valid regex.
    pub fn new(table_pattern: &str) -> Result<Self> {
        Ok(Self {
            table_pattern: table_pattern.to_string(),
            table: full_match_regex(table_pattern)?,
            include: Vec::new(),
            exclude: Vec::new(),
        })
    }

    /// # Errors
    /// Returns `ConfigError` if the pattern is not a valid regex.
    pub fn include(mut self, column_pattern: &str) -> Result<Self> {
        self.include.push(full_match_regex(column_pattern)?);
        Ok(self)
    }

    /// # Errors
    /// Returns `ConfigError` if the pattern is not a valid regex.
    pub fn exclude(mut self, column_pattern: &str) -> Result<Self> {
        self.exclude.push(full_match_regex(column_pattern)?);
        Ok(self)
    }

    fn applies_to(&self, table: &str) -> bool {
        self.table.is_match(table)
    }

    fn accept(&self, column: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|r| r.is_match(column)))
            && !self.exclude.iter().any(|r| r.is_match(column))
    }

    fn merge(&mut self, other: Self) {
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
    }
}

/// Decides which columns of a table survive filtering
#[derive(Debug, Clone)]
pub enum ColumnFilter {
    /// Column rules keyed by table regex
    ByTable(Vec<ColumnRules>),

    /// Drop columns of the listed types
    ExcludeTypes(Vec<DataType>),
}

impl ColumnFilter {
    /// Build a by-table filter; rules sharing a table pattern are merged
    #[must_use]
    pub fn by_table(rules: Vec<ColumnRules>) -> Self {
        let mut merged: Vec<ColumnRules> = Vec::new();
        for rule in rules {
            match merged.iter_mut().find(|r| r.table_pattern == rule.table_pattern) {
                Some(existing) => existing.merge(rule),
                None => merged.push(rule),
            }
        }
        Self::ByTable(merged)
    }

    /// Drop timestamp, time and date columns
    #[must_use]
    pub fn no_temporal() -> Self {
        Self::ExcludeTypes(vec![DataType::Timestamp, DataType::Time, DataType::Date])
    }

    /// Whether a column of `table` is kept
    ///
    /// # Errors
    /// Returns `ConfigError` when two different table patterns with column
    /// rules both match `table`.
    pub fn accept(&self, table: &str, column: &Column) -> Result<bool> {
        match self {
            Self::ExcludeTypes(types) => Ok(!types.contains(&column.data_type)),
            Self::ByTable(rules) => {
                let mut matching = rules.iter().filter(|r| r.applies_to(table));
                let Some(rule) = matching.next() else {
                    return Ok(true);
                };
                if let Some(other) = matching.next() {
                    return Err(DbCompareError::config_error(format!(
                        "Column filtering conflict: table regex {} and {} both match {table} and have column filtering configuration.",
                        rule.table_pattern, other.table_pattern
                    )));
                }
                Ok(rule.accept(&column.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str) -> Column {
        Column::new(name, DataType::Text)
    }

    #[test]
    fn test_by_table_include_exclude() {
        let filter = ColumnFilter::by_table(vec![ColumnRules::new("USER.*")
            .unwrap()
            .include("id|name|created_.*")
            .unwrap()
            .exclude("created_by")
            .unwrap()]);

        assert!(filter.accept("USERS", &text("ID")).unwrap());
        assert!(filter.accept("USERS", &text("created_at")).unwrap());
        assert!(!filter.accept("USERS", &text("created_by")).unwrap());
        assert!(!filter.accept("USERS", &text("email")).unwrap());
        assert!(filter.accept("ORDERS", &text("email")).unwrap());
    }

    #[test]
    fn test_rules_with_same_pattern_merge() {
        let filter = ColumnFilter::by_table(vec![
            ColumnRules::new("T").unwrap().exclude("a").unwrap(),
            ColumnRules::new("T").unwrap().exclude("b").unwrap(),
        ]);
        assert!(!filter.accept("T", &text("a")).unwrap());
        assert!(!filter.accept("T", &text("b")).unwrap());
        assert!(filter.accept("T", &text("c")).unwrap());
    }

    #[test]
    fn test_overlapping_table_patterns_conflict() {
        let filter = ColumnFilter::by_table(vec![
            ColumnRules::new("USER.*").unwrap().exclude("a").unwrap(),
            ColumnRules::new(".*S").unwrap().exclude("b").unwrap(),
        ]);
        let err = filter.accept("USERS", &text("a")).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.message().contains("both match USERS"));
    }

    #[test]
    fn test_no_temporal() {
        let filter = ColumnFilter::no_temporal();
        assert!(!filter.accept("T", &Column::new("at", DataType::Timestamp)).unwrap());
        assert!(!filter.accept("T", &Column::new("on", DataType::Date)).unwrap());
        assert!(filter.accept("T", &Column::new("n", DataType::Integer)).unwrap());
    }
}
