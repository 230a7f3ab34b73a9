//! Equality Comparison
//!
//! Phases, each short-circuiting the next on failure:
//! table set, column counts, row counts, then key-ordered row comparison.

use tracing::{debug, warn};

use crate::compare::matcher::pair_rows;
use crate::compare::report::{DiffReport, TableDiff};
use crate::compare::structure;
use crate::compare::DatasetComparison;
use crate::dataset::{Dataset, Table};
use crate::error::{AssertionFailure, DbCompareError, Result};
use crate::keys::{KeyExtractor, KeyPolicy, PseudoKeys};

pub const STRUCTURE_SUMMARY: &str = "The two compared datasets are different.";
pub const ROWS_SUMMARY: &str = "The actual dataset was different from the expected one";

/// Exact structural and row-level equality of two datasets
#[derive(Debug, Clone, Default)]
pub struct EqualityComparison {
    pseudo_keys: Option<PseudoKeys>,
}

impl EqualityComparison {
    #[must_use]
    pub fn new(pseudo_keys: Option<PseudoKeys>) -> Self {
        Self { pseudo_keys }
    }

    fn check_structure(expected: &Dataset, actual: &Dataset) -> Vec<String> {
        let missing = structure::missing_tables(expected, actual);
        if !missing.is_empty() {
            return missing.iter().map(|t| structure::missing_table_message(t)).collect();
        }
        if let Some(message) = structure::table_count_message(expected, actual) {
            return vec![message];
        }

        let columns = structure::column_count_messages(expected, actual);
        if !columns.is_empty() {
            return columns;
        }
        structure::row_count_messages(expected, actual)
    }

    fn compare_table(
        extractor: &mut KeyExtractor<'_>,
        expected: &Table,
        actual: &Table,
    ) -> Result<TableDiff> {
        let key = extractor.extract_key(expected.metadata(), Some(actual.metadata()))?;
        if !structure::same_column_names(expected.metadata(), actual.metadata()) {
            return Err(DbCompareError::bad_data(format!(
                "Column names of table '{}' differ: [{}] vs [{}]",
                expected.name(),
                expected.metadata().column_names().join(", "),
                actual.metadata().column_names().join(", ")
            )));
        }

        let columns = structure::comparison_columns(expected.metadata());
        let mut diff =
            TableDiff::new(expected.name(), key.iter().map(|c| c.name.clone()).collect());
        diff.cell_mismatches = pair_rows(expected, actual, &columns, &key)?;
        Ok(diff)
    }
}

impl DatasetComparison for EqualityComparison {
    fn name(&self) -> &'static str {
        "equal"
    }

    fn compare(&self, expected: &Dataset, actual: &Dataset) -> Result<()> {
        let mut report = DiffReport::new();

        let problems = Self::check_structure(expected, actual);
        if !problems.is_empty() {
            report.missing_tables = structure::missing_tables(expected, actual);
            report.structural = problems;
            let rendered = report.render_equality();
            return Err(DbCompareError::assertion_failed(AssertionFailure::new(
                STRUCTURE_SUMMARY,
                report,
                rendered,
            )));
        }

        let mut extractor = KeyExtractor::new(KeyPolicy::Equality, self.pseudo_keys.as_ref());
        for table in expected.tables() {
            let Some(other) = actual.table(table.name()) else {
                continue;
            };
            match Self::compare_table(&mut extractor, table, other) {
                Ok(diff) => {
                    debug!(
                        table = %table.name(),
                        mismatches = diff.cell_mismatches.len(),
                        "Compared table rows"
                    );
                    report.push_table(diff);
                }
                Err(err @ DbCompareError::ConfigError(_)) => return Err(err),
                Err(err) => {
                    warn!(table = %table.name(), error = %err, "Table comparison failed");
                    report.failed_tables.push(table.name().to_string());
                }
            }
        }

        if report.has_differences() {
            let rendered = report.render_equality();
            return Err(DbCompareError::assertion_failed(AssertionFailure::new(
                ROWS_SUMMARY,
                report,
                rendered,
            )));
        }
        Ok(())
    }
}
