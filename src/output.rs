//! JSON Output Envelope Types
//!
//! Every CLI command prints exactly one envelope on stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "error": {"code": "...", "message": "..."}}`
//!
//! A failed assertion is an error envelope with code `ASSERTION_FAILED`, the
//! rendered diff report in `error.report` and the report file in `error.diff_file`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DbCompareError;

/// Success envelope for command results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed (equal, contains, dump, execute, load)
    pub command: String,

    /// Command-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for command failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, command: command.into(), error }
    }

    /// Create error envelope from `DbCompareError`
    ///
    /// Assertion failures carry their summary as message, plus the rendered
    /// report and the report file.
    pub fn from_error(command: impl Into<String>, err: &DbCompareError) -> Self {
        let info = match err.as_assertion_failure() {
            Some(failure) => ErrorInfo {
                code: err.error_code().to_string(),
                message: failure.to_string(),
                report: Some(failure.rendered.clone()),
                diff_file: failure.diff_file.clone(),
            },
            None => ErrorInfo::new(err.error_code(), err.message()),
        };
        Self::new(command, info)
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "ASSERTION_FAILED", "CONFIG_ERROR")
    pub code: String,

    pub message: String,

    /// Rendered diff report of a failed assertion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,

    /// Report file written for a failed assertion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_file: Option<PathBuf>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), report: None, diff_file: None }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows read or written, when the command handles rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl Metadata {
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows: None }
    }

    #[must_use]
    pub const fn with_rows(execution_ms: u64, rows: usize) -> Self {
        Self { execution_ms, rows: Some(rows) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::DiffReport;
    use crate::error::AssertionFailure;

    #[test]
    fn test_success_envelope_serialization() {
        let envelope = SuccessEnvelope::new(
            "dump",
            serde_json::json!({"tables": ["users"]}),
            Metadata::with_rows(42, 10),
        );

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(json.contains(r#""command":"dump"#));
        assert!(json.contains(r#""execution_ms":42"#));
        assert!(json.contains(r#""rows":10"#));
    }

    #[test]
    fn test_error_envelope_from_config_error() {
        let err = DbCompareError::config_error("Unknown database operation 'MERGE'");
        let envelope = ErrorEnvelope::from_error("load", &err);

        assert!(!envelope.ok);
        assert_eq!(envelope.command, "load");
        assert_eq!(envelope.error.code, "CONFIG_ERROR");
        assert!(envelope.error.message.contains("MERGE"));

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("report"));
        assert!(!json.contains("diff_file"));
    }

    #[test]
    fn test_error_envelope_from_assertion_failure() {
        let failure = AssertionFailure::new(
            "The first dataset did not contain the second one.",
            DiffReport::default(),
            "Table 'T' ...".to_string(),
        )
        .with_resources("expected", "actual");
        let err = DbCompareError::assertion_failed(failure);
        let envelope = ErrorEnvelope::from_error("contains", &err);

        assert_eq!(envelope.error.code, "ASSERTION_FAILED");
        assert_eq!(
            envelope.error.message,
            "The first dataset did not contain the second one. (expected: expected, actual: actual)"
        );
        assert_eq!(envelope.error.report.as_deref(), Some("Table 'T' ..."));
    }

    #[test]
    fn test_metadata_without_rows() {
        let json = serde_json::to_string(&Metadata::new(100)).unwrap();
        assert!(json.contains(r#""execution_ms":100"#));
        assert!(!json.contains("rows"));
    }
}
