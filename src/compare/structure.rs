//! Structural Checks Shared by Both Comparisons
//!
//! "First" is the actual dataset and "second" the expected one, as they are
//! named in the failure messages.

use crate::compare::report::RowValues;
use crate::dataset::{Column, Dataset, Table, TableMetadata};
use crate::error::Result;

const ONE: &str = "#ONE#";
const TWO: &str = "#TWO#";

/// Fill a "#ONE# ... #TWO#" template, naming the larger side first
fn name_larger_side(template: &str, expected: usize, actual: usize) -> String {
    let (one, two) = if actual > expected { ("first", "second") } else { ("second", "first") };
    template.replace(ONE, one).replace(TWO, two)
}

/// Expected table names absent from the actual dataset
#[must_use]
pub fn missing_tables(expected: &Dataset, actual: &Dataset) -> Vec<String> {
    expected
        .table_names()
        .into_iter()
        .filter(|name| !actual.contains_table(name))
        .map(str::to_string)
        .collect()
}

#[must_use]
pub fn missing_table_message(table: &str) -> String {
    format!("The first dataset does not contain the {table} dataset.")
}

/// Message for differing table counts, `None` when equal
#[must_use]
pub fn table_count_message(expected: &Dataset, actual: &Dataset) -> Option<String> {
    let (e, a) = (expected.len(), actual.len());
    (e != a).then(|| {
        name_larger_side(
            &format!("The {ONE} dataset contains {} more table(s) than the {TWO} one.", e.abs_diff(a)),
            e,
            a,
        )
    })
}

/// One message per expected table whose column count differs
#[must_use]
pub fn column_count_messages(expected: &Dataset, actual: &Dataset) -> Vec<String> {
    count_messages(expected, actual, "column", |t| t.columns().len())
}

/// One message per expected table whose row count differs
#[must_use]
pub fn row_count_messages(expected: &Dataset, actual: &Dataset) -> Vec<String> {
    count_messages(expected, actual, "row", Table::row_count)
}

fn count_messages(
    expected: &Dataset,
    actual: &Dataset,
    what: &str,
    count: impl Fn(&Table) -> usize,
) -> Vec<String> {
    expected
        .tables()
        .iter()
        .filter_map(|table| {
            let other = actual.table(table.name())?;
            let (e, a) = (count(table), count(other));
            (e != a).then(|| {
                name_larger_side(
                    &format!(
                        "Table '{}' contains {} more {what}(s) in the {ONE} dataset than in the {TWO} one.",
                        table.name(),
                        e.abs_diff(a)
                    ),
                    e,
                    a,
                )
            })
        })
        .collect()
}

/// Columns of a table in comparison order (sorted by name, case-insensitive)
#[must_use]
pub fn comparison_columns(metadata: &TableMetadata) -> Vec<Column> {
    let mut columns = metadata.columns.clone();
    columns.sort_by_key(|c| c.name.to_lowercase());
    columns
}

/// Whether both tables have the same column names, ignoring case and order
#[must_use]
pub fn same_column_names(expected: &TableMetadata, actual: &TableMetadata) -> bool {
    expected.columns.len() == actual.columns.len()
        && expected.columns.iter().all(|c| actual.column(&c.name).is_some())
}

/// Values of `row`, read through the given columns
pub fn row_values(table: &Table, row: usize, columns: &[Column]) -> Result<RowValues> {
    columns
        .iter()
        .map(|c| Ok((c.name.clone(), table.value(row, &c.name)?.clone())))
        .collect()
}

/// The actual dataset narrowed to the expected tables and columns
#[derive(Debug, Clone, Default)]
pub struct ContainmentView {
    pub view: Dataset,

    /// Expected tables absent from the actual dataset
    pub missing_tables: Vec<String>,

    /// Per table, expected column names the actual table lacks
    pub missing_columns: Vec<(String, Vec<String>)>,
}

/// Narrow `actual` to what `expected` declares
///
/// Extra actual tables and columns are dropped without being reported.
pub fn containment_view(expected: &Dataset, actual: &Dataset) -> Result<ContainmentView> {
    let mut result = ContainmentView::default();

    for table in expected.tables() {
        let Some(other) = actual.table(table.name()) else {
            result.missing_tables.push(table.name().to_string());
            continue;
        };

        let absent: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| other.metadata().column(&c.name).is_none())
            .map(|c| c.name.clone())
            .collect();
        if !absent.is_empty() {
            result.missing_columns.push((table.name().to_string(), absent));
        }

        result.view.push(other.select_columns(|c| table.metadata().column(&c.name).is_some()))?;
    }

    Ok(result)
}

#[must_use]
pub fn missing_columns_message(table: &str, columns: &[String]) -> String {
    format!(
        " Table '{table}' has no column(s) [{}] in the first dataset. The second dataset can't be included in the first one.",
        columns.join(", ")
    )
}

#[must_use]
pub fn row_overflow_message(table: &str) -> String {
    format!(
        " Table '{table}' has more rows in the second dataset than in the first one. The second dataset can't be included in the first one."
    )
}
