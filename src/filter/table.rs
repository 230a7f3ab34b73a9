//! Table Name Filter

use regex::{Regex, RegexBuilder};

use crate::error::{DbCompareError, Result};

/// Compile a pattern that must match the whole name, ignoring case
pub(crate) fn full_match_regex(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .map_err(|e| DbCompareError::config_error(format!("Invalid filter regex '{pattern}': {e}")))
}

/// Include/exclude regexes on table names
///
/// A table is kept when it matches an include (or no include is given) and
/// matches no exclude.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl TableFilter {
    /// Build a filter from include and exclude patterns
    ///
    /// # Errors
    /// Returns `ConfigError` if a pattern is not a valid regex.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: include.iter().map(|p| full_match_regex(p.as_ref())).collect::<Result<_>>()?,
            exclude: exclude.iter().map(|p| full_match_regex(p.as_ref())).collect::<Result<_>>()?,
        })
    }

    #[must_use]
    pub fn accept(&self, table: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|r| r.is_match(table)))
            && !self.exclude.iter().any(|r| r.is_match(table))
    }
}
