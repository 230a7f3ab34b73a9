//! `SQLite` Target Integration Tests
//!
//! Round trips between CSV dataset directories, the database and the
//! comparisons:
//! - Loading a CSV dataset and asserting the database against it
//! - Typed database values against untyped CSV values
//! - Keyed operations with genuine and pseudo primary keys
//! - Query datasets
//! - Flat XML datasets

#![cfg(feature = "sqlite")]

use std::fs;
use std::path::{Path, PathBuf};

use dbcompare::io::{read_csv_dir, read_xml_dataset, write_csv_dir, write_xml_dataset};
use dbcompare::{
    CompareMode, ConnectionConfig, DatabaseOperation, DatasetAssertion, DatasetResource,
    DatasetTarget, MatchCandidate, PseudoKeys, SqliteTarget, Value,
};

// ============================================================================
// Test Helpers
// ============================================================================

const SCHEMA: &str = "
    CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT NOT NULL, since DATE);
    CREATE TABLE purchase (customer_id INTEGER, item TEXT, amount REAL);
";

fn create_test_db(dir: &Path) -> ConnectionConfig {
    let config = ConnectionConfig::sqlite(dir.join("test.db"));
    SqliteTarget::execute_script(&config, SCHEMA).expect("Failed to create schema");
    config
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(format!("{name}.csv")), contents).unwrap();
    dir.to_path_buf()
}

fn seed(dir: &Path) -> PathBuf {
    let seed = dir.join("seed");
    write_csv(&seed, "customer", "id,name,since\n1,alice,2020-01-31\n2,bob,[NULL]\n");
    write_csv(&seed, "purchase", "customer_id,item,amount\n1,book,12.5\n1,pen,1.0\n2,lamp,30\n");
    seed
}

fn assert_database(
    mode: CompareMode,
    expected_dir: &Path,
    config: &ConnectionConfig,
) -> dbcompare::Result<()> {
    let expected = DatasetResource::new("expected", read_csv_dir(expected_dir)?);
    let actual = DatasetResource::new("db", SqliteTarget::dump(config, None)?).with_metadata(true);
    DatasetAssertion::new(mode).test(&expected, &actual)
}

// ============================================================================
// Load and Assert
// ============================================================================

#[test]
fn test_loaded_dataset_equals_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    let seed = seed(dir.path());

    let affected = SqliteTarget::apply(
        &config,
        &read_csv_dir(&seed).unwrap(),
        DatabaseOperation::CleanInsert,
        None,
    )
    .unwrap();
    assert_eq!(affected, 5);

    assert_database(CompareMode::Equal, &seed, &config).unwrap();
    assert_database(CompareMode::Contain, &seed, &config).unwrap();
}

#[test]
fn test_database_contains_subset_of_columns_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed(dir.path())).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();

    let expected = write_csv(&dir.path().join("expected"), "purchase", "item,amount\nlamp,30.0\n");
    assert_database(CompareMode::Contain, &expected, &config).unwrap();
}

#[test]
fn test_changed_row_is_diagnosed_by_pseudo_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed(dir.path())).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();
    SqliteTarget::execute_script(&config, "UPDATE customer SET name = 'robert' WHERE id = 2;")
        .unwrap();

    let expected = write_csv(&dir.path().join("expected"), "customer", "id,name\n2,bob\n");
    let expected = DatasetResource::new("expected", read_csv_dir(&expected).unwrap());
    let actual = DatasetResource::new("db", SqliteTarget::dump(&config, None).unwrap());

    // CSV datasets carry no primary key of their own
    let without_keys = DatasetAssertion::new(CompareMode::Contain).test(&expected, &actual).unwrap_err();
    let rows = &without_keys.as_assertion_failure().unwrap().report.table("customer").unwrap().missing_rows;
    assert_eq!(rows[0].candidate, MatchCandidate::Disabled);

    let err = DatasetAssertion::new(CompareMode::Contain)
        .with_pseudo_keys(PseudoKeys::from_properties_str("customer=id").unwrap())
        .test(&expected, &actual)
        .unwrap_err();
    let failure = err.as_assertion_failure().unwrap();

    let rows = &failure.report.table("customer").unwrap().missing_rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].candidate, MatchCandidate::OneMatch(1));
    assert!(failure.rendered.contains("{name='robert'}"));
    assert!(failure.rendered.contains("is: [id]."));
}

#[test]
fn test_equality_reports_row_count_difference() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    let seed = seed(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();
    SqliteTarget::execute_script(&config, "DELETE FROM purchase WHERE item = 'pen';").unwrap();

    let err = assert_database(CompareMode::Equal, &seed, &config).unwrap_err();
    let failure = err.as_assertion_failure().unwrap();
    assert_eq!(failure.summary, "The two compared datasets are different.");
    assert_eq!(
        failure.rendered,
        "Table 'purchase' contains 1 more row(s) in the second dataset than in the first one."
    );
}

// ============================================================================
// Keyed Operations
// ============================================================================

#[test]
fn test_update_then_delete_by_primary_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed(dir.path())).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();

    let change = write_csv(&dir.path().join("change"), "customer", "id,name,since\n1,alicia,2020-01-31\n");
    let change = read_csv_dir(&change).unwrap();
    assert_eq!(SqliteTarget::apply(&config, &change, DatabaseOperation::Update, None).unwrap(), 1);

    let dumped = SqliteTarget::dump(&config, Some(&["customer".to_string()])).unwrap();
    assert_eq!(dumped.table("customer").unwrap().value(0, "name").unwrap(), &Value::from("alicia"));

    assert_eq!(SqliteTarget::apply(&config, &change, DatabaseOperation::Delete, None).unwrap(), 1);
    let dumped = SqliteTarget::dump(&config, Some(&["customer".to_string()])).unwrap();
    assert_eq!(dumped.table("customer").unwrap().row_count(), 1);
}

#[test]
fn test_keyless_table_needs_pseudo_key_for_delete() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed(dir.path())).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();

    let removal = write_csv(&dir.path().join("removal"), "purchase", "customer_id,item\n1,pen\n");
    let removal = read_csv_dir(&removal).unwrap();

    let err = SqliteTarget::apply(&config, &removal, DatabaseOperation::Delete, None).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");

    let keys = PseudoKeys::from_properties_str("purchase=customer_id,item").unwrap();
    let deleted =
        SqliteTarget::apply(&config, &removal, DatabaseOperation::Delete, Some(&keys)).unwrap();
    assert_eq!(deleted, 1);
}

#[test]
fn test_operation_none_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    let seed = read_csv_dir(&seed(dir.path())).unwrap();
    assert_eq!(SqliteTarget::apply(&config, &seed, DatabaseOperation::None, None).unwrap(), 0);
    assert!(SqliteTarget::dump(&config, None).unwrap().tables().iter().all(|t| t.row_count() == 0));
}

// ============================================================================
// Query Datasets
// ============================================================================

#[test]
fn test_query_dataset_round_trips_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    SqliteTarget::apply(&config, &read_csv_dir(&seed(dir.path())).unwrap(), DatabaseOperation::Insert, None)
        .unwrap();

    let totals = SqliteTarget::query(
        &config,
        "SELECT customer_id, SUM(amount) AS total FROM purchase GROUP BY customer_id ORDER BY customer_id",
        "totals",
    )
    .unwrap();
    let out = dir.path().join("totals");
    write_csv_dir(&out, &totals).unwrap();

    let expected = write_csv(&dir.path().join("expected"), "totals", "customer_id,total\n1,13.5\n2,30\n");
    let expected = DatasetResource::new("expected", read_csv_dir(&expected).unwrap());
    let actual = DatasetResource::new("query", read_csv_dir(&out).unwrap());
    DatasetAssertion::new(CompareMode::Equal).test(&expected, &actual).unwrap();
}

// ============================================================================
// Flat XML Datasets
// ============================================================================

#[test]
fn test_xml_dataset_loads_and_compares_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_db(dir.path());
    let seed = dir.path().join("customers.xml");
    fs::write(
        &seed,
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <dataset>
          <customer id="10" name="jane" since="2021-06-01"/>
          <customer id="9" name="ann" since="[NULL]"/>
          <customer id="100" name="zoe" since="2019-12-24"/>
        </dataset>"#,
    )
    .unwrap();

    let customers = read_xml_dataset(&seed).unwrap();
    assert_eq!(SqliteTarget::apply(&config, &customers, DatabaseOperation::CleanInsert, None).unwrap(), 3);

    let dumped = SqliteTarget::dump(&config, Some(&["customer".to_string()])).unwrap();
    let expected = DatasetResource::new("expected", customers);
    let actual = DatasetResource::new("db", dumped.clone()).with_metadata(true);
    DatasetAssertion::new(CompareMode::Equal).test(&expected, &actual).unwrap();

    let out = dir.path().join("dump.xml");
    write_xml_dataset(&out, &dumped).unwrap();
    let reread = DatasetResource::new("dump", read_xml_dataset(&out).unwrap());
    DatasetAssertion::new(CompareMode::Equal).test(&reread, &actual).unwrap();
    DatasetAssertion::new(CompareMode::Equal).test(&expected, &reread).unwrap();
}
