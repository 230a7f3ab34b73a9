//! Dataset Filters
//!
//! A [`FilterPipeline`] is an ordered list of [`FilterStep`]s. Each step takes
//! a dataset and builds a new one; the input is never modified. Pipelines run
//! before a comparison, on both datasets.

pub mod column;
pub mod table;

pub use column::{ColumnFilter, ColumnRules};
pub use table::TableFilter;

use tracing::debug;

use crate::config::FilterConfig;
use crate::dataset::{Dataset, Table};
use crate::error::{DbCompareError, Result};
use crate::keys::PseudoKeys;

/// One dataset transformation
#[derive(Debug, Clone)]
pub enum FilterStep {
    /// Keep the tables the filter accepts
    Tables(TableFilter),

    /// Keep the columns the filter accepts
    Columns(ColumnFilter),

    /// Drop genuine primary key columns, and pseudo key columns when given
    HidePrimaryKeys { pseudo_keys: Option<PseudoKeys> },

    /// Lower-case column and key names
    LowerCase,
}

impl FilterStep {
    /// # Errors
    /// Returns `ConfigError` on a column filtering conflict.
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        let tables = match self {
            Self::Tables(filter) => dataset
                .tables()
                .iter()
                .filter(|t| filter.accept(t.name()))
                .cloned()
                .collect(),
            Self::Columns(filter) => dataset
                .tables()
                .iter()
                .map(|t| filter_columns(t, filter))
                .collect::<Result<Vec<_>>>()?,
            Self::HidePrimaryKeys { pseudo_keys } => dataset
                .tables()
                .iter()
                .map(|t| {
                    t.select_columns(|c| {
                        !t.metadata().is_primary_key(&c.name)
                            && !pseudo_keys
                                .as_ref()
                                .is_some_and(|k| k.is_pseudo_key_column(t.name(), &c.name))
                    })
                })
                .collect(),
            Self::LowerCase => dataset.tables().iter().map(Table::lower_cased).collect(),
        };
        Dataset::new(tables)
    }
}

fn filter_columns(table: &Table, filter: &ColumnFilter) -> Result<Table> {
    // Decide every column first so a conflict surfaces as an error
    let decisions = table
        .columns()
        .iter()
        .map(|c| filter.accept(table.name(), c))
        .collect::<Result<Vec<bool>>>()?;
    let mut decisions = decisions.into_iter();
    Ok(table.select_columns(|_| decisions.next().unwrap_or(false)))
}

/// Ordered filter steps
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    steps: Vec<FilterStep>,
}

impl FilterPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_step(mut self, step: FilterStep) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build the pipeline a filter configuration describes
    ///
    /// Steps run in this order: tables, column rules, excluded types,
    /// primary key hiding, lower-casing.
    ///
    /// # Errors
    /// Returns `ConfigError` for invalid regexes or non-temporal excluded types.
    pub fn from_config(config: &FilterConfig, pseudo_keys: Option<&PseudoKeys>) -> Result<Self> {
        let mut pipeline = Self::new();

        if !config.include_tables.is_empty() || !config.exclude_tables.is_empty() {
            pipeline = pipeline.with_step(FilterStep::Tables(TableFilter::new(
                &config.include_tables,
                &config.exclude_tables,
            )?));
        }

        if !config.columns.is_empty() {
            let mut rules = Vec::with_capacity(config.columns.len());
            for rule in &config.columns {
                let mut built = ColumnRules::new(&rule.table)?;
                for pattern in &rule.include {
                    built = built.include(pattern)?;
                }
                for pattern in &rule.exclude {
                    built = built.exclude(pattern)?;
                }
                rules.push(built);
            }
            pipeline = pipeline.with_step(FilterStep::Columns(ColumnFilter::by_table(rules)));
        }

        if !config.exclude_types.is_empty() {
            if let Some(bad) = config.exclude_types.iter().find(|t| !t.is_temporal()) {
                return Err(DbCompareError::config_error(format!(
                    "Only timestamp, time and date columns can be excluded by type, not '{bad}'"
                )));
            }
            pipeline = pipeline
                .with_step(FilterStep::Columns(ColumnFilter::ExcludeTypes(config.exclude_types.clone())));
        }

        if config.remove_primary_keys {
            pipeline = pipeline
                .with_step(FilterStep::HidePrimaryKeys { pseudo_keys: pseudo_keys.cloned() });
        }

        if config.lower_case {
            pipeline = pipeline.with_step(FilterStep::LowerCase);
        }

        Ok(pipeline)
    }

    /// Run every step in order
    ///
    /// # Errors
    /// Propagates the first failing step's error.
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        let mut current = dataset.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
        }
        debug!(steps = self.steps.len(), tables = current.len(), "Applied filter pipeline");
        Ok(current)
    }
}
