//! dbcompare - Database Dataset Assertions
//!
//! dbcompare compares an expected tabular dataset with an actual one, either
//! for equality or for containment, and explains every difference in a
//! stable, human-readable diff report.
//!
//! # Core Principles
//! - Rows are matched by value, never by position (except for key-sorted equality pairing)
//! - A missing or wrong configuration is a configuration error, never a data difference
//! - Deterministic behavior (identical inputs → identical reports)
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`dataset`] - Tables, columns, typed values
//! - [`keys`] - Pseudo primary keys and comparison key resolution
//! - [`compare`] - Row matching, diff reports, equality and containment strategies
//! - [`filter`] - Dataset filter pipelines
//! - [`assertion`] - Filter + compare + report artifact, as one call
//! - [`config`] - Configuration files
//! - [`io`] - CSV dataset directories and flat XML files
//! - [`engine`] - Database targets (`SQLite`)
//! - [`operation`] - Dataset-driven database operations
//! - [`output`] - JSON output envelopes for the CLI

pub mod assertion;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod filter;
pub mod io;
pub mod keys;
pub mod operation;
pub mod output;

pub use assertion::{CompareMode, DatasetAssertion, DatasetResource};
pub use compare::{
    ContainmentComparison, DatasetComparison, DiffReport, EqualityComparison, MatchCandidate,
    TableDiff,
};
pub use config::{CompareConfig, FilterConfig};
pub use dataset::{Column, DataType, Dataset, Table, TableMetadata, Value};
pub use engine::{ConnectionConfig, DatabaseType, DatasetTarget};
pub use error::{AssertionFailure, DbCompareError, Result};
pub use filter::{FilterPipeline, FilterStep};
pub use keys::{KeyExtractor, KeyPolicy, PseudoKeys};
pub use operation::DatabaseOperation;
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};

#[cfg(feature = "sqlite")]
pub use engine::sqlite::SqliteTarget;
