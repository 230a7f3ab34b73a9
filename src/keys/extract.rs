//! Comparison Key Resolution
//!
//! Decides, per table, which columns identify a row. First rule that applies wins:
//! 1. a declared pseudo key (must validate, else the comparison aborts)
//! 2. the table's genuine primary key
//! 3. equality only: the other side's primary key restricted to columns this
//!    table has, else this table's first column
//! 4. containment: no key
//!
//! Containment never borrows the actual side's key. An expected table without
//! key metadata (a CSV or XML dataset, say) checked against a database gets
//! disabled row diagnostics unless a pseudo key is declared for it.
//!
//! Results are cached by table name for the lifetime of one extractor, which
//! the comparison strategies create per `compare` call.

use std::collections::HashMap;

use tracing::debug;

use crate::dataset::{Column, TableMetadata};
use crate::error::{DbCompareError, Result};
use crate::keys::PseudoKeys;

/// Which comparison the key is resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    Equality,
    Containment,
}

/// Per-comparison key resolver with a table-name cache
#[derive(Debug)]
pub struct KeyExtractor<'a> {
    policy: KeyPolicy,
    pseudo_keys: Option<&'a PseudoKeys>,
    cache: HashMap<String, Vec<Column>>,
}

impl<'a> KeyExtractor<'a> {
    #[must_use]
    pub fn new(policy: KeyPolicy, pseudo_keys: Option<&'a PseudoKeys>) -> Self {
        Self { policy, pseudo_keys, cache: HashMap::new() }
    }

    #[must_use]
    pub const fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Resolve the key columns of `table`, possibly empty
    ///
    /// `other` is the same table on the opposite side of the comparison.
    ///
    /// # Errors
    /// Returns `ConfigError` when a declared pseudo key names columns the table lacks.
    pub fn extract_key(
        &mut self,
        table: &TableMetadata,
        other: Option<&TableMetadata>,
    ) -> Result<Vec<Column>> {
        let cache_key = table.name.to_lowercase();
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached.clone());
        }

        let key = self.resolve(table, other)?;
        debug!(
            table = %table.name,
            key = ?key.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Resolved comparison key"
        );
        self.cache.insert(cache_key, key.clone());
        Ok(key)
    }

    fn resolve(&self, table: &TableMetadata, other: Option<&TableMetadata>) -> Result<Vec<Column>> {
        if let Some(pseudo_keys) = self.pseudo_keys.filter(|k| k.has_pseudo_key(&table.name)) {
            let validation = pseudo_keys.validate(table);
            if !validation.is_valid() {
                return Err(DbCompareError::config_error(validation.not_found_message(table)));
            }
            return Ok(validation.into_columns());
        }

        let genuine = table.primary_key_columns();
        if !genuine.is_empty() {
            return Ok(genuine);
        }

        match self.policy {
            KeyPolicy::Containment => Ok(Vec::new()),
            KeyPolicy::Equality => {
                let borrowed: Vec<Column> = other
                    .map(|o| {
                        o.primary_keys.iter().filter_map(|k| table.column(k)).cloned().collect()
                    })
                    .unwrap_or_default();
                if !borrowed.is_empty() {
                    return Ok(borrowed);
                }
                Ok(table.columns.first().cloned().into_iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataType;

    fn users(keys: &[&str]) -> TableMetadata {
        TableMetadata::new(
            "USERS",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::Text),
                Column::new("email", DataType::Text),
            ],
        )
        .with_primary_keys(keys.iter().copied())
    }

    #[test]
    fn test_pseudo_key_wins_over_genuine_key() {
        let mut ppk = PseudoKeys::new();
        ppk.define("users", ["email"]).unwrap();

        for policy in [KeyPolicy::Equality, KeyPolicy::Containment] {
            let mut extractor = KeyExtractor::new(policy, Some(&ppk));
            let key = extractor.extract_key(&users(&["id"]), Some(&users(&["id"]))).unwrap();
            assert_eq!(key, vec![Column::new("email", DataType::Text)]);
        }
    }

    #[test]
    fn test_invalid_pseudo_key_is_config_error() {
        let mut ppk = PseudoKeys::new();
        ppk.define("USERS", ["sku"]).unwrap();

        let mut extractor = KeyExtractor::new(KeyPolicy::Containment, Some(&ppk));
        let err = extractor.extract_key(&users(&[]), None).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.message().contains("[sku]"));
        assert!(err.message().contains("[id, name, email]"));
    }

    #[test]
    fn test_genuine_key() {
        let mut extractor = KeyExtractor::new(KeyPolicy::Containment, None);
        let key = extractor.extract_key(&users(&["ID"]), None).unwrap();
        assert_eq!(key, vec![Column::new("id", DataType::Integer)]);
    }

    #[test]
    fn test_equality_borrows_other_side_key() {
        let mut other = users(&["email", "missing"]);
        other.columns.push(Column::new("missing", DataType::Text));

        let mut extractor = KeyExtractor::new(KeyPolicy::Equality, None);
        let key = extractor.extract_key(&users(&[]), Some(&other)).unwrap();
        assert_eq!(key, vec![Column::new("email", DataType::Text)]);
    }

    #[test]
    fn test_equality_falls_back_to_first_column() {
        let mut extractor = KeyExtractor::new(KeyPolicy::Equality, None);
        let key = extractor.extract_key(&users(&[]), Some(&users(&[]))).unwrap();
        assert_eq!(key, vec![Column::new("id", DataType::Integer)]);

        let mut extractor = KeyExtractor::new(KeyPolicy::Equality, None);
        let empty = TableMetadata::new("EMPTY", Vec::new());
        assert!(extractor.extract_key(&empty, None).unwrap().is_empty());
    }

    #[test]
    fn test_containment_without_key_is_empty() {
        let mut extractor = KeyExtractor::new(KeyPolicy::Containment, None);
        assert!(extractor.extract_key(&users(&[]), Some(&users(&["id"]))).unwrap().is_empty());
    }

    #[test]
    fn test_results_are_cached_per_table_name() {
        let mut extractor = KeyExtractor::new(KeyPolicy::Containment, None);
        let first = extractor.extract_key(&users(&["id"]), None).unwrap();
        // same name, different metadata: the cached key is returned
        let second = extractor.extract_key(&users(&[]), None).unwrap();
        assert_eq!(first, second);
    }
}
