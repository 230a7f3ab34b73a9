//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout dbcompare.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `ConfigError`: The setup is wrong (pseudo keys, filters, config files). Fatal, never retried.
//! - `AssertionFailed`: The data is wrong. Carries the diff report of the failed comparison.
//! - `BadData`: A dataset could not be read or holds values its column type rejects
//! - `InvalidInput`: Malformed input or missing required parameters
//! - `ConnectionFailed`, `QueryFailed`, `EngineError`: Database target errors

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::compare::DiffReport;

/// Main error type for dbcompare operations
#[derive(Error, Debug)]
pub enum DbCompareError {
    /// Configuration error (missing pseudo key column, bad filter, unreadable config file)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The compared datasets differ
    #[error("Assertion failed: {0}")]
    AssertionFailed(Box<AssertionFailure>),

    /// Dataset content could not be read or converted
    #[error("Bad data: {0}")]
    BadData(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    EngineError { engine: String, detail: String },
}

impl DbCompareError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::AssertionFailed(_) => "ASSERTION_FAILED",
            Self::BadData(_) => "BAD_DATA",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::EngineError { .. } => "ENGINE_ERROR",
        }
    }

    /// Get human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Borrow the assertion failure, if this error is one
    #[must_use]
    pub fn as_assertion_failure(&self) -> Option<&AssertionFailure> {
        match self {
            Self::AssertionFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an assertion failure
    pub fn assertion_failed(failure: AssertionFailure) -> Self {
        Self::AssertionFailed(Box::new(failure))
    }

    /// Create a bad data error
    pub fn bad_data(message: impl Into<String>) -> Self {
        Self::BadData(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an engine-specific error
    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineError { engine: engine.into(), detail: detail.into() }
    }
}

/// Payload of a failed comparison
///
/// `summary` is the one-sentence reason. `report` is the structured diff and
/// `rendered` its text form. `diff_file` points at the written report artifact;
/// it is `None` when the artifact could not be written or no report directory
/// was configured.
#[derive(Debug, Clone)]
pub struct AssertionFailure {
    pub summary: String,
    pub expected: String,
    pub actual: String,
    pub report: DiffReport,
    pub rendered: String,
    pub diff_file: Option<PathBuf>,
}

impl AssertionFailure {
    /// Build a failure from a strategy's comparison result
    pub fn new(summary: impl Into<String>, report: DiffReport, rendered: String) -> Self {
        Self {
            summary: summary.into(),
            expected: String::new(),
            actual: String::new(),
            report,
            rendered,
            diff_file: None,
        }
    }

    /// Attach the names of the compared resources
    #[must_use]
    pub fn with_resources(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = expected.into();
        self.actual = actual.into();
        self
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expected.is_empty() && self.actual.is_empty() {
            write!(f, "{}", self.summary)
        } else {
            write!(f, "{} (expected: {}, actual: {})", self.summary, self.expected, self.actual)
        }
    }
}

/// Result type alias for dbcompare operations
pub type Result<T> = std::result::Result<T, DbCompareError>;
