//! CSV Directory Datasets
//!
//! A dataset directory holds one `<table>.csv` per table, header row first.
//! Table order comes from `table-ordering.txt` when present, else file names
//! sorted alphabetically. `[NULL]` (or `[null]`) cells are nulls.
//!
//! Values are read as text into untyped columns; typed comparison coerces
//! them against the other side's column types.

use std::fs;
use std::path::Path;

use super::{cell_text, read_cell};
use crate::dataset::{Column, DataType, Dataset, Table, TableMetadata};
use crate::error::{DbCompareError, Result};

pub const TABLE_ORDERING_FILE: &str = "table-ordering.txt";

fn table_names(dir: &Path) -> Result<Vec<String>> {
    let ordering = dir.join(TABLE_ORDERING_FILE);
    if ordering.is_file() {
        let contents = fs::read_to_string(&ordering).map_err(|e| {
            DbCompareError::bad_data(format!("Could not read {}: {e}", ordering.display()))
        })?;
        return Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        DbCompareError::bad_data(format!("Could not read dataset directory {}: {e}", dir.display()))
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DbCompareError::bad_data(format!("Could not list {}: {e}", dir.display())))?
            .path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Read one CSV file as a table named `name`
pub fn read_csv_table(path: &Path, name: &str) -> Result<Table> {
    let bad = |e: csv::Error| DbCompareError::bad_data(format!("{}: {e}", path.display()));

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path).map_err(bad)?;
    let columns: Vec<Column> = reader
        .headers()
        .map_err(bad)?
        .iter()
        .map(|h| Column::new(h.trim(), DataType::Unknown))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(bad)?;
        rows.push(record.iter().map(read_cell).collect());
    }

    Table::new(TableMetadata::new(name, columns), rows)
}

/// Read a dataset directory
///
/// # Errors
/// Returns `BadData` if the directory, the ordering file or a table file
/// cannot be read, or a record has the wrong number of fields.
pub fn read_csv_dir(dir: &Path) -> Result<Dataset> {
    if !dir.is_dir() {
        return Err(DbCompareError::bad_data(format!(
            "Dataset directory {} does not exist",
            dir.display()
        )));
    }

    let mut dataset = Dataset::default();
    for name in table_names(dir)? {
        dataset.push(read_csv_table(&dir.join(format!("{name}.csv")), &name)?)?;
    }
    Ok(dataset)
}

/// Write a dataset directory, table ordering file included
pub fn write_csv_dir(dir: &Path, dataset: &Dataset) -> Result<()> {
    let io_err = |e: std::io::Error| {
        DbCompareError::bad_data(format!("Could not write dataset directory {}: {e}", dir.display()))
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    for table in dataset.tables() {
        let path = dir.join(format!("{}.csv", table.name()));
        let bad = |e: csv::Error| DbCompareError::bad_data(format!("{}: {e}", path.display()));

        let mut writer = csv::Writer::from_path(&path).map_err(bad)?;
        writer.write_record(table.metadata().column_names()).map_err(bad)?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(cell_text))
                .map_err(bad)?;
        }
        writer.flush().map_err(io_err)?;
    }

    let mut ordering = dataset.table_names().join("\n");
    ordering.push('\n');
    fs::write(dir.join(TABLE_ORDERING_FILE), ordering).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    #[test]
    fn test_read_dir_with_ordering_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("USERS.csv"), "id,name\n1,alice\n2,[NULL]\n").unwrap();
        fs::write(dir.path().join("ORDERS.csv"), "id,user_id\n10,1\n").unwrap();
        fs::write(dir.path().join(TABLE_ORDERING_FILE), "USERS\nORDERS\n").unwrap();

        let dataset = read_csv_dir(dir.path()).unwrap();
        assert_eq!(dataset.table_names(), vec!["USERS", "ORDERS"]);

        let users = dataset.table("users").unwrap();
        assert_eq!(users.metadata().column_names(), vec!["id", "name"]);
        assert!(users.columns().iter().all(|c| c.data_type == DataType::Unknown));
        assert_eq!(users.value(0, "name").unwrap(), &Value::from("alice"));
        assert_eq!(users.value(1, "name").unwrap(), &Value::Null);
    }

    #[test]
    fn test_alphabetical_order_without_ordering_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n[null]\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let dataset = read_csv_dir(dir.path()).unwrap();
        assert_eq!(dataset.table_names(), vec!["a", "b"]);
        assert!(dataset.table("a").unwrap().value(0, "x").unwrap().is_null());
    }

    #[test]
    fn test_ragged_record_is_bad_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.csv"), "a,b\n1\n").unwrap();
        let err = read_csv_dir(dir.path()).unwrap_err();
        assert_eq!(err.error_code(), "BAD_DATA");
    }

    #[test]
    fn test_missing_dir_is_bad_data() {
        let err = read_csv_dir(Path::new("/nonexistent/dataset")).unwrap_err();
        assert_eq!(err.error_code(), "BAD_DATA");
    }

    #[test]
    fn test_written_dir_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(
            TableMetadata::new(
                "ITEM",
                vec![Column::new("sku", DataType::Text), Column::new("qty", DataType::Integer)],
            ),
            vec![vec![Value::from("a-1"), Value::Integer(3)], vec![Value::from("b,2"), Value::Null]],
        )
        .unwrap();
        write_csv_dir(dir.path(), &Dataset::new(vec![table]).unwrap()).unwrap();

        let read = read_csv_dir(dir.path()).unwrap();
        let item = read.table("ITEM").unwrap();
        assert_eq!(item.value(1, "sku").unwrap(), &Value::from("b,2"));
        assert_eq!(item.value(0, "qty").unwrap(), &Value::from("3"));
        assert!(item.value(1, "qty").unwrap().is_null());
    }
}
