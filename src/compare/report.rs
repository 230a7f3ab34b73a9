//! Diff Report
//!
//! Accumulates everything a failed comparison found, table by table in the
//! order tables were compared, and renders it as the text artifact attached
//! to the failure.

use std::fmt::Write as _;

use crate::compare::matcher::{CellMismatch, MatchCandidate};
use crate::dataset::Value;

/// Column name / value pairs of one row, in report column order
pub type RowValues = Vec<(String, Value)>;

/// An expected row the actual table does not contain
#[derive(Debug, Clone, PartialEq)]
pub struct MissingRow {
    pub expected_row: usize,
    pub values: RowValues,
    pub candidate: MatchCandidate,

    /// Values of the candidate actual row, when the diagnostic found one
    pub candidate_values: Option<RowValues>,
}

/// Differences found in one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    pub table: String,

    /// Key columns used for the table, empty when none could be resolved
    pub key_columns: Vec<String>,
    pub missing_rows: Vec<MissingRow>,
    pub cell_mismatches: Vec<CellMismatch>,
}

impl TableDiff {
    pub fn new(table: impl Into<String>, key_columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            key_columns,
            missing_rows: Vec::new(),
            cell_mismatches: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_differences(&self) -> bool {
        !self.missing_rows.is_empty() || !self.cell_mismatches.is_empty()
    }

    /// Trailing note naming the key columns, or explaining their absence
    #[must_use]
    pub fn key_note(&self) -> String {
        if self.key_columns.is_empty() {
            format!(
                "Note : As table \"{}\" has no (pseudo) primary key, it is not possible to match the rows from the two datasets.",
                self.table
            )
        } else {
            format!(
                "Note : The (pseudo) primary key used for table  \"{}\" is: [{}].",
                self.table,
                self.key_columns.join(", ")
            )
        }
    }
}

/// Everything a failed comparison found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    /// Expected tables absent from the actual dataset
    pub missing_tables: Vec<String>,

    /// Table-level problems that prevented row comparison
    pub structural: Vec<String>,

    /// Row-level differences, in comparison order
    pub tables: Vec<TableDiff>,

    /// Tables whose row comparison could not run (equality only)
    pub failed_tables: Vec<String>,
}

impl DiffReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything was recorded
    #[must_use]
    pub fn has_differences(&self) -> bool {
        !self.missing_tables.is_empty()
            || !self.structural.is_empty()
            || !self.failed_tables.is_empty()
            || self.tables.iter().any(TableDiff::has_differences)
    }

    /// Record a table's differences; tables without any are skipped
    pub fn push_table(&mut self, diff: TableDiff) {
        if diff.has_differences() {
            self.tables.push(diff);
        }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDiff> {
        self.tables.iter().find(|t| t.table.eq_ignore_ascii_case(name))
    }

    /// Text of a failed containment comparison
    #[must_use]
    pub fn render_containment(&self) -> String {
        let mut out = String::from("The dataset did not contain the expected data.\n\n");

        if !self.missing_tables.is_empty() {
            out.push_str("* Some table(s) was(were) not found:\n");
            for table in &self.missing_tables {
                let _ = writeln!(
                    out,
                    "\t- Table '{table}' is present in the second dataset but not in the first one."
                );
            }
            out.push_str("\n\n");
        }

        if !self.structural.is_empty() {
            out.push_str("* Some table(s) could not be compared:\n");
            for problem in &self.structural {
                let _ = writeln!(out, "\t- {}", problem.trim());
            }
            out.push_str("\n\n");
        }

        for table in self.tables.iter().filter(|t| !t.missing_rows.is_empty()) {
            let _ = writeln!(out, "* Table \"{}\" did not contains the following row(s):", table.table);
            for row in &table.missing_rows {
                push_row(&mut out, "\t", &row.values);
                match row.candidate {
                    MatchCandidate::Disabled => {}
                    MatchCandidate::NoMatch => {
                        out.push_str("\t\t --> No match found in the actual dataset by reducing the search to primary key column(s).\n\n");
                    }
                    MatchCandidate::OneMatch(_) => {
                        out.push_str("\t\t --> The following match was found by reducing the search to the primary key column(s):\n");
                        push_candidate(&mut out, row);
                    }
                    MatchCandidate::ManyMatch(_) => {
                        out.push_str("\t\t --> Several matches were found by reducing the search to the primary key column(s). The first match is:\n");
                        push_candidate(&mut out, row);
                    }
                }
            }
            out.push_str(&table.key_note());
            out.push_str("\n\n\n");
        }

        out
    }

    /// Text of a failed equality comparison
    ///
    /// A structural failure renders as its combined message alone.
    #[must_use]
    pub fn render_equality(&self) -> String {
        if !self.structural.is_empty() {
            return self.structural.join("\n");
        }

        let mut out = String::from("The actual dataset was different from the expected one.\n\n");
        for table in self.tables.iter().filter(|t| !t.cell_mismatches.is_empty()) {
            let _ = writeln!(out, "* Table \"{}\":", table.table);
            for mismatch in &table.cell_mismatches {
                let _ = writeln!(
                    out,
                    "\t- row {}{}: column '{}' expected '{}' but was '{}'",
                    mismatch.row,
                    format_cells(&mismatch.key),
                    mismatch.column,
                    mismatch.expected,
                    mismatch.actual
                );
            }
            out.push('\n');
            out.push_str(&table.key_note());
            out.push_str("\n\n\n");
        }

        if !self.failed_tables.is_empty() {
            out.push_str("The Following tables had compare issues (most likely size differences)\n");
            for table in &self.failed_tables {
                let _ = writeln!(out, "{table}");
            }
        }

        out
    }
}

/// ` {col='v'} {col='v'}`
fn format_cells(values: &[(String, Value)]) -> String {
    values.iter().fold(String::new(), |mut acc, (column, value)| {
        let _ = write!(acc, " {{{column}='{value}'}}");
        acc
    })
}

fn push_row(out: &mut String, indent: &str, values: &[(String, Value)]) {
    let _ = writeln!(out, "{indent} -{}", format_cells(values));
}

fn push_candidate(out: &mut String, row: &MissingRow) {
    if let Some(values) = &row.candidate_values {
        push_row(out, "\t\t", values);
    }
    out.push('\n');
}
