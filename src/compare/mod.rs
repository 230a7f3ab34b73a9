//! Dataset Comparison
//!
//! Two strategies behind one trait:
//! - [`EqualityComparison`]: same tables, same shape, same rows
//! - [`ContainmentComparison`]: every expected row can be found in the actual dataset
//!
//! A strategy returns `Ok(())` on pass. A difference in the data is an
//! `AssertionFailed` error carrying the [`DiffReport`]; a setup problem such
//! as an invalid pseudo primary key is a `ConfigError` and aborts the whole
//! comparison. Both strategies only read their inputs, and key resolution is
//! cached per `compare` call.

pub mod contains;
pub mod equals;
pub mod matcher;
pub mod report;
pub mod structure;

pub use contains::ContainmentComparison;
pub use equals::EqualityComparison;
pub use matcher::{match_rows, pair_rows, CellMismatch, MatchCandidate, MatchOutcome, UnmatchedRow};
pub use report::{DiffReport, MissingRow, RowValues, TableDiff};

use crate::dataset::Dataset;
use crate::error::Result;

/// A way of comparing an expected dataset with an actual one
pub trait DatasetComparison {
    /// Short name used in logs and CLI output
    fn name(&self) -> &'static str;

    /// Compare the two datasets
    ///
    /// # Errors
    /// `AssertionFailed` when the datasets differ, `ConfigError` when the
    /// comparison cannot be set up.
    fn compare(&self, expected: &Dataset, actual: &Dataset) -> Result<()>;
}
