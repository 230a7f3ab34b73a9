//! Flat XML Datasets
//!
//! One file per dataset. Every child of the root element is a row: the element
//! name is the table, each attribute a column value.
//!
//! ```xml
//! <dataset>
//!   <USERS id="1" name="alice"/>
//!   <USERS id="2" name="[NULL]"/>
//!   <ORDERS/>
//! </dataset>
//! ```
//!
//! A table's columns are the attributes of its first row. Later rows lacking
//! one of them hold null there; attributes outside them are dropped with a
//! warning. An element without attributes declares a table but adds no row.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use super::{cell_text, read_cell};
use crate::dataset::{Column, DataType, Dataset, Table, TableMetadata, Value};
use crate::error::{DbCompareError, Result};

const ROOT: &str = "dataset";

fn malformed(path: &Path, err: impl std::fmt::Display) -> DbCompareError {
    DbCompareError::bad_data(format!(
        "Cannot create dataset from {}, something must be wrong with the underlying xml: {err}",
        path.display()
    ))
}

/// A table being collected from its row elements
struct PendingTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl PendingTable {
    fn add_row(&mut self, mut attributes: Vec<(String, Value)>) {
        let row: Vec<Value> = self
            .columns
            .iter()
            .map(|column| {
                attributes
                    .iter()
                    .position(|(name, _)| name.eq_ignore_ascii_case(column))
                    .map_or(Value::Null, |index| attributes.swap_remove(index).1)
            })
            .collect();
        for (name, _) in &attributes {
            warn!(table = %self.name, column = %name, "Ignoring column absent from the first row");
        }
        self.rows.push(row);
    }
}

fn row_element(
    element: &BytesStart<'_>,
    decoder: quick_xml::encoding::Decoder,
    path: &Path,
    tables: &mut Vec<PendingTable>,
) -> Result<()> {
    let name = std::str::from_utf8(element.name().as_ref()).map_err(|e| malformed(path, e))?.to_string();

    let mut attributes = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| malformed(path, e))?;
        let key = std::str::from_utf8(attribute.key.as_ref()).map_err(|e| malformed(path, e))?;
        let value =
            attribute.decode_and_unescape_value(decoder).map_err(|e| malformed(path, e))?;
        attributes.push((key.to_string(), read_cell(&value)));
    }

    let index = match tables.iter().position(|t| t.name.eq_ignore_ascii_case(&name)) {
        Some(index) => index,
        None => {
            tables.push(PendingTable {
                columns: attributes.iter().map(|(column, _)| column.clone()).collect(),
                name,
                rows: Vec::new(),
            });
            tables.len() - 1
        }
    };
    if !attributes.is_empty() {
        tables[index].add_row(attributes);
    }
    Ok(())
}

/// Read a flat XML dataset file
///
/// Values are text in untyped columns and `[NULL]` (or `[null]`) is null.
///
/// # Errors
/// Returns `BadData` when the file cannot be read or is not well-formed.
pub fn read_xml_dataset(path: &Path) -> Result<Dataset> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DbCompareError::bad_data(format!("Could not read {}: {e}", path.display())))?;

    let mut reader = Reader::from_str(&contents);
    reader.config_mut().trim_text(true);
    let decoder = reader.decoder();

    let mut tables = Vec::new();
    let mut depth = 0usize;
    let mut has_root = false;
    loop {
        match reader.read_event().map_err(|e| malformed(path, e))? {
            Event::Start(element) => {
                depth += 1;
                has_root = true;
                if depth == 2 {
                    row_element(&element, decoder, path, &mut tables)?;
                }
            }
            Event::Empty(element) => {
                has_root = true;
                if depth == 1 {
                    row_element(&element, decoder, path, &mut tables)?;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }
    if !has_root {
        return Err(malformed(path, "no root element"));
    }

    let mut dataset = Dataset::default();
    for table in tables {
        let columns = table.columns.iter().map(|c| Column::new(c, DataType::Unknown)).collect();
        dataset.push(Table::new(TableMetadata::new(table.name, columns), table.rows)?)?;
    }
    Ok(dataset)
}

/// Write a dataset as a flat XML file
///
/// Nulls are written as `[NULL]` so a table's first row always names every
/// column. A table without rows is written as one attribute-less element.
///
/// # Errors
/// Returns `BadData` when the file cannot be written.
pub fn write_xml_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let failed = |e| write_failed(path, e);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))).map_err(failed)?;
    writer.write_event(Event::Start(BytesStart::new(ROOT))).map_err(failed)?;

    for table in dataset.tables() {
        if table.row_count() == 0 {
            writer.write_event(Event::Empty(BytesStart::new(table.name()))).map_err(failed)?;
            continue;
        }
        for row in table.rows() {
            let mut element = BytesStart::new(table.name());
            for (column, value) in table.columns().iter().zip(row) {
                element.push_attribute((column.name.as_str(), cell_text(value).as_str()));
            }
            writer.write_event(Event::Empty(element)).map_err(failed)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT))).map_err(failed)?;
    fs::write(path, writer.into_inner()).map_err(|e| write_failed(path, e))
}

fn write_failed(path: &Path, err: impl std::fmt::Display) -> DbCompareError {
    DbCompareError::bad_data(format!("Could not write {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(xml: &str) -> Result<Dataset> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xml");
        fs::write(&path, xml).unwrap();
        read_xml_dataset(&path)
    }

    #[test]
    fn test_read_rows_tables_and_nulls() {
        let dataset = read(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <dataset>
              <USERS id="1" name="alice"/>
              <ORDERS/>
              <USERS id="2" name="[NULL]"/>
              <users id="3"/>
            </dataset>"#,
        )
        .unwrap();

        assert_eq!(dataset.table_names(), vec!["USERS", "ORDERS"]);
        assert_eq!(dataset.table("ORDERS").unwrap().row_count(), 0);

        let users = dataset.table("USERS").unwrap();
        assert_eq!(users.metadata().column_names(), vec!["id", "name"]);
        assert!(users.columns().iter().all(|c| c.data_type == DataType::Unknown));
        assert_eq!(users.row_count(), 3);
        assert_eq!(users.value(0, "name").unwrap(), &Value::from("alice"));
        assert!(users.value(1, "name").unwrap().is_null());
        assert!(users.value(2, "name").unwrap().is_null());
    }

    #[test]
    fn test_columns_come_from_first_row() {
        let dataset = read(r#"<dataset><T a="1"/><T a="2" b="x"/><T b="y" a="3"></T></dataset>"#).unwrap();
        let t = dataset.table("T").unwrap();
        assert_eq!(t.metadata().column_names(), vec!["a"]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(2, "a").unwrap(), &Value::from("3"));
    }

    #[test]
    fn test_escaped_values_are_unescaped() {
        let dataset = read(r#"<dataset><T v="a &amp; &quot;b&quot; &lt;c&gt;"/></dataset>"#).unwrap();
        assert_eq!(dataset.table("T").unwrap().value(0, "v").unwrap(), &Value::from(r#"a & "b" <c>"#));
    }

    #[test]
    fn test_malformed_xml_is_bad_data() {
        let err = read(r#"<dataset><T a="1"></dataset>"#).unwrap_err();
        assert_eq!(err.error_code(), "BAD_DATA");
        assert!(err.to_string().contains("underlying xml"));

        assert_eq!(read("").unwrap_err().error_code(), "BAD_DATA");
        assert_eq!(read_xml_dataset(Path::new("/nonexistent/data.xml")).unwrap_err().error_code(), "BAD_DATA");
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        let item = Table::new(
            TableMetadata::new(
                "ITEM",
                vec![Column::new("sku", DataType::Text), Column::new("qty", DataType::Integer)],
            ),
            vec![vec![Value::from("a<1>"), Value::Null], vec![Value::from("b&2"), Value::Integer(3)]],
        )
        .unwrap();
        let empty = Table::new(TableMetadata::new("EMPTY", vec![Column::new("x", DataType::Text)]), vec![])
            .unwrap();
        write_xml_dataset(&path, &Dataset::new(vec![item, empty]).unwrap()).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#"<ITEM sku="a&lt;1&gt;" qty="[NULL]"/>"#));
        assert!(written.contains("<EMPTY/>"));

        let read = read_xml_dataset(&path).unwrap();
        assert_eq!(read.table_names(), vec!["ITEM", "EMPTY"]);
        let item = read.table("ITEM").unwrap();
        assert!(item.value(0, "qty").unwrap().is_null());
        assert_eq!(item.value(0, "sku").unwrap(), &Value::from("a<1>"));
        assert_eq!(item.value(1, "sku").unwrap(), &Value::from("b&2"));
        assert_eq!(item.value(1, "qty").unwrap(), &Value::from("3"));
    }
}
