//! Dataset Files
//!
//! Two formats, both untyped and without key metadata:
//! - CSV dataset directories, one file per table ([`csv`])
//! - flat XML files, one element per row ([`xml`])
//!
//! [`read_dataset`] and [`write_dataset`] pick the format from the path: a
//! `.xml` extension means flat XML, anything else a CSV directory.

pub mod csv;
pub mod xml;

use std::path::Path;

pub use self::csv::{read_csv_dir, read_csv_table, write_csv_dir};
pub use self::xml::{read_xml_dataset, write_xml_dataset};

use crate::dataset::{Dataset, Value};
use crate::error::Result;

/// Cell text standing for a null value
pub const NULL_MARKER: &str = "[NULL]";

/// Cell read from a file: the null markers become `Null`, anything else text
pub(crate) fn read_cell(field: &str) -> Value {
    if field == NULL_MARKER || field == "[null]" {
        Value::Null
    } else {
        Value::from(field)
    }
}

pub(crate) fn cell_text(value: &Value) -> String {
    if value.is_null() {
        NULL_MARKER.to_string()
    } else {
        value.to_string()
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Read a flat XML file or a CSV dataset directory
///
/// # Errors
/// Returns `BadData` when the file or directory cannot be read.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    if is_xml(path) {
        read_xml_dataset(path)
    } else {
        read_csv_dir(path)
    }
}

/// Write a flat XML file or a CSV dataset directory
///
/// # Errors
/// Returns `BadData` when the file or directory cannot be written.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if is_xml(path) {
        write_xml_dataset(path, dataset)
    } else {
        write_csv_dir(path, dataset)
    }
}
