//! Row Matching
//!
//! Two pairing strategies over typed rows:
//!
//! - [`match_rows`] is the containment matcher. Every expected row is looked
//!   up among the still-unconsumed actual rows by eliminating candidates one
//!   comparison column at a time. Surviving candidates count as a match and
//!   the lowest index is consumed. Rows left without a candidate are narrowed
//!   again on the key columns only to tell the reader which actual row they
//!   were probably meant to be.
//! - [`pair_rows`] is the equality matcher. Both tables are sorted on the key
//!   columns and compared position by position, cell by cell.
//!
//! Both are pure: the tables are only read and the outcome is returned.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::dataset::value::common_type;
use crate::dataset::{Column, DataType, Table, Value};
use crate::error::{DbCompareError, Result};

/// Diagnostic outcome for an expected row that found no full match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCandidate {
    /// No key columns, no narrowing attempted
    Disabled,
    NoMatch,
    /// Exactly one unconsumed actual row shares the key values
    OneMatch(usize),
    /// Several unconsumed actual rows share the key values; holds the first
    ManyMatch(usize),
}

impl MatchCandidate {
    /// Actual row index the diagnostic points at
    #[must_use]
    pub const fn row(&self) -> Option<usize> {
        match self {
            Self::OneMatch(row) | Self::ManyMatch(row) => Some(*row),
            Self::Disabled | Self::NoMatch => None,
        }
    }
}

/// An expected row without counterpart in the actual table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmatchedRow {
    pub expected_row: usize,
    pub candidate: MatchCandidate,
}

/// Result of [`match_rows`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Unmatched expected rows, in expected order
    pub unmatched: Vec<UnmatchedRow>,

    /// Actual rows consumed by a match
    pub consumed: BTreeSet<usize>,
}

impl MatchOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// One differing cell between two rows paired by [`pair_rows`]
#[derive(Debug, Clone, PartialEq)]
pub struct CellMismatch {
    /// Position of the pair in key order
    pub row: usize,
    pub column: String,
    pub expected: Value,
    pub actual: Value,

    /// Key values of the expected row
    pub key: Vec<(String, Value)>,
}

/// A comparison column resolved to its position and shared type on both sides
#[derive(Debug, Clone, Copy)]
struct ColumnPair<'c> {
    column: &'c Column,
    data_type: DataType,
    expected: usize,
    actual: usize,
}

impl ColumnPair<'_> {
    fn same(&self, expected: &Value, actual: &Value) -> bool {
        self.data_type.compare_lenient(expected, actual) == Ordering::Equal
    }
}

fn resolve_pairs<'c>(
    expected: &Table,
    actual: &Table,
    columns: &'c [Column],
) -> Result<Vec<ColumnPair<'c>>> {
    columns
        .iter()
        .map(|column| {
            let locate = |table: &Table| {
                table.metadata().column_index(&column.name).ok_or_else(|| {
                    DbCompareError::bad_data(format!(
                        "Column '{}' not found in table '{}'",
                        column.name,
                        table.name()
                    ))
                })
            };
            let (e, a) = (locate(expected)?, locate(actual)?);
            let data_type = shared_type(column, (expected, e), (actual, a));
            Ok(ColumnPair { column, data_type, expected: e, actual: a })
        })
        .collect()
}

/// The one type both sides of a column are read as
///
/// The first declared type among the given column, the expected column and
/// the actual column. Columns untyped on both sides take the common type of
/// their non-null values, falling back to text.
fn shared_type(column: &Column, expected: (&Table, usize), actual: (&Table, usize)) -> DataType {
    let declared = [
        column.data_type,
        expected.0.columns()[expected.1].data_type,
        actual.0.columns()[actual.1].data_type,
    ];
    if let Some(declared) = declared.into_iter().find(|t| *t != DataType::Unknown) {
        return declared;
    }

    column_values(expected)
        .chain(column_values(actual))
        .filter(|v| !v.is_null())
        .map(Value::natural_type)
        .reduce(common_type)
        .filter(|t| *t != DataType::Unknown)
        .unwrap_or(DataType::Text)
}

fn column_values<'t>((table, index): (&'t Table, usize)) -> impl Iterator<Item = &'t Value> {
    table.rows().iter().map(move |row| &row[index])
}

/// Drop the candidates whose value differs from the expected row on every given column
fn eliminate(
    expected_row: &[Value],
    actual: &Table,
    pairs: &[ColumnPair<'_>],
    mut candidates: Vec<usize>,
) -> Vec<usize> {
    for pair in pairs {
        if candidates.is_empty() {
            break;
        }
        let wanted = &expected_row[pair.expected];
        candidates.retain(|&index| pair.same(wanted, &actual.rows()[index][pair.actual]));
    }
    candidates
}

/// Find every expected row among the actual rows
///
/// `comparison_columns` are expected-side columns in the order elimination
/// runs (callers sort them by name). `key_columns` drive the diagnostic pass;
/// when empty every unmatched row is [`MatchCandidate::Disabled`].
///
/// Values unreadable as their column's type never match a readable one.
///
/// # Errors
/// Returns `BadData` when a column is absent from either table.
pub fn match_rows(
    expected: &Table,
    actual: &Table,
    comparison_columns: &[Column],
    key_columns: &[Column],
) -> Result<MatchOutcome> {
    let pairs = resolve_pairs(expected, actual, comparison_columns)?;
    let key_pairs = resolve_pairs(expected, actual, key_columns)?;

    let mut unconsumed: BTreeSet<usize> = (0..actual.row_count()).collect();
    let mut consumed = BTreeSet::new();
    let mut missing = Vec::new();

    for (row_index, row) in expected.rows().iter().enumerate() {
        let candidates = eliminate(row, actual, &pairs, unconsumed.iter().copied().collect());
        match candidates.first() {
            Some(&first) => {
                unconsumed.remove(&first);
                consumed.insert(first);
            }
            None => missing.push(row_index),
        }
    }

    let mut unmatched = Vec::with_capacity(missing.len());
    for expected_row in missing {
        let candidate = if key_pairs.is_empty() {
            MatchCandidate::Disabled
        } else {
            let row = &expected.rows()[expected_row];
            let narrowed =
                eliminate(row, actual, &key_pairs, unconsumed.iter().copied().collect());
            match narrowed.as_slice() {
                [] => MatchCandidate::NoMatch,
                [only] => MatchCandidate::OneMatch(*only),
                [first, ..] => MatchCandidate::ManyMatch(*first),
            }
        };
        unmatched.push(UnmatchedRow { expected_row, candidate });
    }

    Ok(MatchOutcome { unmatched, consumed })
}

/// Row indices of `table` sorted on the given column positions and types
fn sorted_order(table: &Table, positions: &[(usize, DataType)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..table.row_count()).collect();
    order.sort_by(|&a, &b| {
        positions
            .iter()
            .map(|(position, data_type)| {
                data_type.compare_lenient(&table.rows()[a][*position], &table.rows()[b][*position])
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Pair the rows of two equally sized tables in key order and list the differing cells
///
/// Both tables sort each key column as the same shared type. A value
/// unreadable as that type is reported as a differing cell.
///
/// # Errors
/// Returns `BadData` when the row counts differ or a column is absent from
/// either table.
pub fn pair_rows(
    expected: &Table,
    actual: &Table,
    comparison_columns: &[Column],
    key_columns: &[Column],
) -> Result<Vec<CellMismatch>> {
    if expected.row_count() != actual.row_count() {
        return Err(DbCompareError::bad_data(format!(
            "Table '{}' has {} row(s) on one side and {} on the other",
            expected.name(),
            expected.row_count(),
            actual.row_count()
        )));
    }

    let pairs = resolve_pairs(expected, actual, comparison_columns)?;
    let key_pairs = resolve_pairs(expected, actual, key_columns)?;

    let expected_keys: Vec<(usize, DataType)> = key_pairs.iter().map(|p| (p.expected, p.data_type)).collect();
    let actual_keys: Vec<(usize, DataType)> = key_pairs.iter().map(|p| (p.actual, p.data_type)).collect();
    let expected_order = sorted_order(expected, &expected_keys);
    let actual_order = sorted_order(actual, &actual_keys);

    let mut mismatches = Vec::new();
    for (position, (&e, &a)) in expected_order.iter().zip(&actual_order).enumerate() {
        let expected_row = &expected.rows()[e];
        let actual_row = &actual.rows()[a];
        for pair in &pairs {
            let left = &expected_row[pair.expected];
            let right = &actual_row[pair.actual];
            if !pair.same(left, right) {
                mismatches.push(CellMismatch {
                    row: position,
                    column: pair.column.name.clone(),
                    expected: left.clone(),
                    actual: right.clone(),
                    key: key_pairs
                        .iter()
                        .map(|k| (k.column.name.clone(), expected_row[k.expected].clone()))
                        .collect(),
                });
            }
        }
    }
    Ok(mismatches)
}
