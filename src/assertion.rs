//! Dataset Assertions
//!
//! Wires filters, pseudo keys and a comparison strategy together and turns a
//! failed comparison into an [`AssertionFailure`] naming both resources, with
//! the rendered report written next to it as a `binaryDataSet*.diff` file.
//!
//! # Example
//! ```no_run
//! use dbcompare::{CompareMode, DatasetAssertion, DatasetResource, Dataset};
//!
//! # fn run(expected: Dataset, actual: Dataset) -> dbcompare::Result<()> {
//! let assertion = DatasetAssertion::new(CompareMode::Contain).with_report_dir("target/diffs");
//! assertion.test(
//!     &DatasetResource::new("expected.csv", expected),
//!     &DatasetResource::new("db", actual),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::compare::{ContainmentComparison, DatasetComparison, EqualityComparison};
use crate::config::CompareConfig;
use crate::dataset::Dataset;
use crate::error::{AssertionFailure, DbCompareError, Result};
use crate::filter::FilterPipeline;
use crate::keys::PseudoKeys;

/// Which comparison an assertion runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Same tables, same shape, same rows
    Equal,
    /// Every expected row is found in the actual dataset
    Contain,
}

impl CompareMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Contain => "contain",
        }
    }
}

/// A named dataset taking part in an assertion
#[derive(Debug, Clone)]
pub struct DatasetResource {
    pub name: String,
    pub dataset: Dataset,

    /// Whether primary key metadata came from the source (a database) rather than being absent (CSV)
    pub has_metadata: bool,
}

impl DatasetResource {
    pub fn new(name: impl Into<String>, dataset: Dataset) -> Self {
        Self { name: name.into(), dataset, has_metadata: false }
    }

    #[must_use]
    pub const fn with_metadata(mut self, has_metadata: bool) -> Self {
        self.has_metadata = has_metadata;
        self
    }
}

/// A configured dataset comparison
#[derive(Debug, Clone)]
pub struct DatasetAssertion {
    mode: CompareMode,
    filters: Vec<FilterPipeline>,
    pseudo_keys: Option<PseudoKeys>,
    report_dir: Option<PathBuf>,
}

impl DatasetAssertion {
    #[must_use]
    pub const fn new(mode: CompareMode) -> Self {
        Self { mode, filters: Vec::new(), pseudo_keys: None, report_dir: None }
    }

    /// Build an assertion from a comparison configuration
    ///
    /// # Errors
    /// Returns `ConfigError` if a referenced file cannot be loaded.
    pub fn from_config(mode: CompareMode, config: &CompareConfig) -> Result<Self> {
        let pseudo_keys = config.load_pseudo_keys()?;
        let filters = config.load_filters(pseudo_keys.as_ref())?;

        let mut assertion = Self::new(mode);
        assertion.filters = filters;
        assertion.pseudo_keys = pseudo_keys;
        assertion.report_dir.clone_from(&config.report_dir);
        Ok(assertion)
    }

    #[must_use]
    pub const fn mode(&self) -> CompareMode {
        self.mode
    }

    /// Add a filter pipeline, applied after the ones already added
    #[must_use]
    pub fn with_filter(mut self, filter: FilterPipeline) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the pseudo primary keys; a second configuration is ignored
    #[must_use]
    pub fn with_pseudo_keys(mut self, pseudo_keys: PseudoKeys) -> Self {
        if self.pseudo_keys.is_some() {
            warn!("Redundant pseudo primary key configuration will be ignored");
        } else {
            self.pseudo_keys = Some(pseudo_keys);
        }
        self
    }

    #[must_use]
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn pseudo_keys(&self) -> Option<&PseudoKeys> {
        self.pseudo_keys.as_ref()
    }

    fn strategy(&self) -> Box<dyn DatasetComparison> {
        match self.mode {
            CompareMode::Equal => Box::new(EqualityComparison::new(self.pseudo_keys.clone())),
            CompareMode::Contain => Box::new(ContainmentComparison::new(self.pseudo_keys.clone())),
        }
    }

    fn filtered(&self, dataset: &Dataset) -> Result<Dataset> {
        let mut current = dataset.clone();
        for filter in &self.filters {
            current = filter.apply(&current)?;
        }
        Ok(current)
    }

    /// Compare `actual` against `expected`
    ///
    /// # Errors
    /// `AssertionFailed` when the comparison fails, carrying both resource
    /// names, the report and the path of the written report file.
    /// `ConfigError` when the comparison cannot be set up.
    pub fn test(&self, expected: &DatasetResource, actual: &DatasetResource) -> Result<()> {
        let expected_data = self.filtered(&expected.dataset)?;
        let actual_data = self.filtered(&actual.dataset)?;

        let strategy = self.strategy();
        debug!(
            mode = strategy.name(),
            expected = %expected.name,
            actual = %actual.name,
            expected_metadata = expected.has_metadata,
            actual_metadata = actual.has_metadata,
            "Comparing datasets"
        );

        match strategy.compare(&expected_data, &actual_data) {
            Ok(()) => Ok(()),
            Err(DbCompareError::AssertionFailed(failure)) => {
                let mut failure: AssertionFailure =
                    (*failure).with_resources(&expected.name, &actual.name);
                if let Some(dir) = &self.report_dir {
                    failure.diff_file = match write_report(dir, &failure.rendered) {
                        Ok(path) => Some(path),
                        Err(err) => {
                            error!(
                                error = %err,
                                "Error while reporting assertion failure. Failure details won't be available."
                            );
                            None
                        }
                    };
                }
                Err(DbCompareError::assertion_failed(failure))
            }
            Err(err) => Err(err),
        }
    }
}

/// Write the report to a new `binaryDataSet*.diff` file in `dir`
///
/// The file is removed again if writing fails.
fn write_report(dir: &Path, rendered: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new().prefix("binaryDataSet").suffix(".diff").tempfile_in(dir)?;
    file.write_all(rendered.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}
