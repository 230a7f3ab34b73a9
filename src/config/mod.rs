//! Configuration Loading
//!
//! This module loads the files that set up a comparison.
//!
//! # Files
//! - Pseudo primary keys: properties text, one `TABLE=col1,col2` per line
//! - Filters: JSON [`FilterConfig`]
//! - Comparison: JSON [`CompareConfig`] pointing at the two above
//!
//! Relative paths inside a comparison configuration are resolved against the
//! directory holding that configuration file.
//!
//! # Example
//! ```json
//! {
//!   "pseudo_keys": "ppk.properties",
//!   "filters": ["filters/no-audit.json"],
//!   "report_dir": "target/diffs"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::DataType;
use crate::error::{DbCompareError, Result};
use crate::filter::FilterPipeline;
use crate::keys::PseudoKeys;

/// Filter configuration
///
/// Every field is optional; an empty document yields an empty pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Table name regexes to keep (all tables when empty)
    pub include_tables: Vec<String>,

    /// Table name regexes to drop
    pub exclude_tables: Vec<String>,

    /// Column rules keyed by table regex
    pub columns: Vec<ColumnRuleConfig>,

    /// Column types to drop (`timestamp`, `time`, `date`)
    pub exclude_types: Vec<DataType>,

    /// Drop primary key columns, pseudo key columns included
    pub remove_primary_keys: bool,

    /// Lower-case column names
    pub lower_case: bool,
}

/// Column include/exclude regexes for tables matching `table`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRuleConfig {
    pub table: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Comparison configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Pseudo primary key properties file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudo_keys: Option<PathBuf>,

    /// Filter configuration files, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<PathBuf>,

    /// Directory receiving `.diff` report files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,
}

impl CompareConfig {
    /// Resolve every relative path against `base`
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.pseudo_keys = self.pseudo_keys.map(resolve);
        self.filters = self.filters.into_iter().map(resolve).collect();
        self.report_dir = self.report_dir.map(resolve);
        self
    }

    /// Load the pseudo keys this configuration points at, if any
    pub fn load_pseudo_keys(&self) -> Result<Option<PseudoKeys>> {
        self.pseudo_keys.as_deref().map(load_pseudo_keys).transpose()
    }

    /// Load and build every filter pipeline, in order
    pub fn load_filters(&self, pseudo_keys: Option<&PseudoKeys>) -> Result<Vec<FilterPipeline>> {
        self.filters
            .iter()
            .map(|path| FilterPipeline::from_config(&load_filter_config(path)?, pseudo_keys))
            .collect()
    }
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        DbCompareError::config_error(format!("Could not read {what} file {}: {e}", path.display()))
    })
}

/// Load pseudo primary key definitions from a properties file
pub fn load_pseudo_keys(path: &Path) -> Result<PseudoKeys> {
    let contents = read_file(path, "pseudo primary key")?;
    PseudoKeys::from_properties_str(&contents).map_err(|e| match e {
        DbCompareError::ConfigError(message) => {
            DbCompareError::config_error(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Load a filter configuration file
pub fn load_filter_config(path: &Path) -> Result<FilterConfig> {
    let contents = read_file(path, "filter configuration")?;
    serde_json::from_str(&contents).map_err(|e| {
        DbCompareError::config_error(format!(
            "Invalid filter configuration file format {}: {e}",
            path.display()
        ))
    })
}

/// Load a comparison configuration file, resolving its relative paths
pub fn load_compare_config(path: &Path) -> Result<CompareConfig> {
    let contents = read_file(path, "comparison configuration")?;
    let config: CompareConfig = serde_json::from_str(&contents).map_err(|e| {
        DbCompareError::config_error(format!(
            "Invalid comparison configuration file format {}: {e}",
            path.display()
        ))
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolved_against(base))
}
