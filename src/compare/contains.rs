//! Containment Comparison
//!
//! Passes when every expected table, column and row can be found in the
//! actual dataset. The actual side may hold more of each.

use tracing::{debug, warn};

use crate::compare::matcher::match_rows;
use crate::compare::report::{DiffReport, MissingRow, TableDiff};
use crate::compare::structure;
use crate::compare::DatasetComparison;
use crate::dataset::{Column, Dataset, Table};
use crate::error::{AssertionFailure, DbCompareError, Result};
use crate::keys::{KeyExtractor, KeyPolicy, PseudoKeys};

pub const SUMMARY: &str = "The first dataset did not contain the second one.";

/// Whether the actual dataset includes the expected one
#[derive(Debug, Clone, Default)]
pub struct ContainmentComparison {
    pseudo_keys: Option<PseudoKeys>,
}

impl ContainmentComparison {
    #[must_use]
    pub fn new(pseudo_keys: Option<PseudoKeys>) -> Self {
        Self { pseudo_keys }
    }

    fn compare_table(expected: &Table, actual: &Table, key: &[Column]) -> Result<TableDiff> {
        let columns = structure::comparison_columns(expected.metadata());
        let outcome = match_rows(expected, actual, &columns, key)?;
        debug!(
            table = %expected.name(),
            matched = outcome.consumed.len(),
            unmatched = outcome.unmatched.len(),
            "Matched table rows"
        );

        let mut diff = TableDiff::new(expected.name(), key.iter().map(|c| c.name.clone()).collect());
        for unmatched in outcome.unmatched {
            let candidate_values = unmatched
                .candidate
                .row()
                .map(|row| structure::row_values(actual, row, expected.columns()))
                .transpose()?;
            diff.missing_rows.push(MissingRow {
                expected_row: unmatched.expected_row,
                values: structure::row_values(expected, unmatched.expected_row, expected.columns())?,
                candidate: unmatched.candidate,
                candidate_values,
            });
        }
        Ok(diff)
    }
}

impl DatasetComparison for ContainmentComparison {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn compare(&self, expected: &Dataset, actual: &Dataset) -> Result<()> {
        let view = structure::containment_view(expected, actual)?;
        let mut report = DiffReport::new();
        report.missing_tables.clone_from(&view.missing_tables);

        let mut extractor = KeyExtractor::new(KeyPolicy::Containment, self.pseudo_keys.as_ref());
        for table in expected.tables() {
            let Some(other) = view.view.table(table.name()) else {
                continue;
            };
            let key = extractor.extract_key(table.metadata(), Some(other.metadata()))?;

            if let Some((_, absent)) =
                view.missing_columns.iter().find(|(name, _)| name == table.name())
            {
                report.structural.push(structure::missing_columns_message(table.name(), absent));
                continue;
            }
            if table.row_count() > other.row_count() {
                report.structural.push(structure::row_overflow_message(table.name()));
                continue;
            }

            match Self::compare_table(table, other, &key) {
                Ok(diff) => report.push_table(diff),
                Err(err) => {
                    warn!(table = %table.name(), error = %err, "Table comparison failed");
                    report
                        .structural
                        .push(format!("Table '{}' could not be compared: {err}", table.name()));
                }
            }
        }

        if report.has_differences() {
            let rendered = report.render_containment();
            return Err(DbCompareError::assertion_failed(AssertionFailure::new(
                SUMMARY, report, rendered,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::matcher::MatchCandidate;
    use crate::dataset::{DataType, TableMetadata, Value};

    fn users(rows: &[(i64, &str)]) -> Table {
        Table::new(
            TableMetadata::new(
                "USER",
                vec![Column::new("id", DataType::Integer), Column::new("name", DataType::Text)],
            )
            .with_primary_keys(["id"]),
            rows.iter().map(|(id, name)| vec![Value::Integer(*id), Value::from(*name)]).collect(),
        )
        .unwrap()
    }

    fn dataset(tables: Vec<Table>) -> Dataset {
        Dataset::new(tables).unwrap()
    }

    #[test]
    fn test_extra_actual_rows_are_ignored() {
        let expected = dataset(vec![users(&[(1, "a"), (2, "b")])]);
        let actual = dataset(vec![users(&[(1, "a"), (2, "b"), (3, "c")])]);
        assert!(ContainmentComparison::default().compare(&expected, &actual).is_ok());
    }

    #[test]
    fn test_missing_row_reported_with_no_match() {
        let expected = dataset(vec![users(&[(1, "a"), (2, "b")])]);
        let actual = dataset(vec![users(&[(1, "a"), (3, "c")])]);

        let err = ContainmentComparison::default().compare(&expected, &actual).unwrap_err();
        let failure = err.as_assertion_failure().unwrap();
        assert_eq!(failure.summary, SUMMARY);

        let diff = failure.report.table("USER").unwrap();
        assert_eq!(diff.missing_rows.len(), 1);
        assert_eq!(diff.missing_rows[0].candidate, MatchCandidate::NoMatch);
        assert!(failure.rendered.contains("\t - {id='2'} {name='b'}\n"));
    }

    #[test]
    fn test_row_overflow_is_structural() {
        let expected = dataset(vec![users(&[(1, "a"), (2, "b")])]);
        let actual = dataset(vec![users(&[(1, "a")])]);

        let err = ContainmentComparison::default().compare(&expected, &actual).unwrap_err();
        let report = &err.as_assertion_failure().unwrap().report;
        assert!(report.tables.is_empty());
        assert_eq!(report.structural.len(), 1);
        assert!(report.structural[0].contains("Table 'USER' has more rows in the second dataset"));
    }

    #[test]
    fn test_missing_table_does_not_stop_other_tables() {
        let gone = Table::empty(TableMetadata::new("GONE", vec![Column::new("id", DataType::Integer)]));
        let expected = dataset(vec![gone, users(&[(9, "z")])]);
        let actual = dataset(vec![users(&[(1, "a")])]);

        let err = ContainmentComparison::default().compare(&expected, &actual).unwrap_err();
        let report = &err.as_assertion_failure().unwrap().report;
        assert_eq!(report.missing_tables, vec!["GONE"]);
        assert!(report.table("USER").is_some());
    }

    #[test]
    fn test_missing_column_is_structural() {
        let narrow = Table::new(
            TableMetadata::new("USER", vec![Column::new("id", DataType::Integer)]),
            vec![vec![Value::Integer(1)]],
        )
        .unwrap();
        let expected = dataset(vec![users(&[(1, "a")])]);
        let actual = dataset(vec![narrow]);

        let err = ContainmentComparison::default().compare(&expected, &actual).unwrap_err();
        let report = &err.as_assertion_failure().unwrap().report;
        assert!(report.structural[0].contains("has no column(s) [name]"));
    }

    #[test]
    fn test_no_key_disables_diagnostics() {
        let keyless = |rows: &[(i64, &str)]| {
            Table::new(
                TableMetadata::new(
                    "LOG",
                    vec![Column::new("id", DataType::Integer), Column::new("msg", DataType::Text)],
                ),
                rows.iter().map(|(id, m)| vec![Value::Integer(*id), Value::from(*m)]).collect(),
            )
            .unwrap()
        };
        let expected = dataset(vec![keyless(&[(1, "x")])]);
        let actual = dataset(vec![keyless(&[(1, "y")])]);

        let err = ContainmentComparison::default().compare(&expected, &actual).unwrap_err();
        let failure = err.as_assertion_failure().unwrap();
        let diff = failure.report.table("LOG").unwrap();
        assert!(diff.key_columns.is_empty());
        assert_eq!(diff.missing_rows[0].candidate, MatchCandidate::Disabled);
        assert!(failure.rendered.contains("has no (pseudo) primary key"));
    }
}
