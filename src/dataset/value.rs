//! Cell Values and Column Types
//!
//! Values are compared through their column's [`DataType`], never through raw
//! equality: a numeric column compares `"10"` and `10` as equal, and `Null`
//! only ever equals `Null`.

use std::cmp::Ordering;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DbCompareError, Result};

const TIMESTAMP_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// No declared type; values compare by their own natural type
    Unknown,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
}

impl DataType {
    /// Get the type name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Binary => "binary",
        }
    }

    /// Map a declared SQL column type to a `DataType`
    ///
    /// Follows `SQLite` affinity rules, with date/time names recognised before
    /// the generic affinities. An empty declaration maps to `Unknown`.
    #[must_use]
    pub fn from_sql_type(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        if upper.is_empty() {
            Self::Unknown
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
            Self::Timestamp
        } else if upper.contains("DATE") {
            Self::Date
        } else if upper.contains("TIME") {
            Self::Time
        } else if upper.contains("BOOL") {
            Self::Boolean
        } else if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") || upper.contains("BINARY") {
            Self::Binary
        } else if upper.contains("REAL")
            || upper.contains("FLOA")
            || upper.contains("DOUB")
            || upper.contains("NUMERIC")
            || upper.contains("DECIMAL")
        {
            Self::Decimal
        } else {
            Self::Unknown
        }
    }

    /// Whether this is one of the date/time types
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// Compare two values as this type
    ///
    /// Both values are coerced to the type before comparison. `Null` sorts
    /// before every other value and equals only `Null`.
    ///
    /// # Errors
    /// Returns `BadData` when a value cannot be read as this type.
    pub fn compare(&self, left: &Value, right: &Value) -> Result<Ordering> {
        match (left, right) {
            (Value::Null, Value::Null) => return Ok(Ordering::Equal),
            (Value::Null, _) => return Ok(Ordering::Less),
            (_, Value::Null) => return Ok(Ordering::Greater),
            _ => {}
        }

        let effective = match self {
            Self::Unknown => common_type(left.natural_type(), right.natural_type()),
            other => *other,
        };

        match effective {
            Self::Integer | Self::Decimal => {
                Ok(compare_numbers(left.to_number(effective)?, right.to_number(effective)?))
            }
            Self::Boolean => Ok(left.to_boolean()?.cmp(&right.to_boolean()?)),
            Self::Date => Ok(left.to_date()?.cmp(&right.to_date()?)),
            Self::Time => Ok(left.to_time()?.cmp(&right.to_time()?)),
            Self::Timestamp => Ok(left.to_timestamp()?.cmp(&right.to_timestamp()?)),
            Self::Binary => Ok(left.to_bytes().cmp(&right.to_bytes())),
            Self::Text | Self::Unknown => Ok(left.to_string().cmp(&right.to_string())),
        }
    }

    /// Whether two values are equal as this type
    ///
    /// # Errors
    /// Returns `BadData` when a value cannot be read as this type.
    pub fn matches(&self, left: &Value, right: &Value) -> Result<bool> {
        Ok(self.compare(left, right)? == Ordering::Equal)
    }

    /// Compare two values as this type, without failing on unreadable values
    ///
    /// Values that cannot be read as this type sort after the readable ones
    /// and among themselves by their text, so an unreadable value only equals
    /// a value with the same text. A total order for one concrete type.
    #[must_use]
    pub fn compare_lenient(&self, left: &Value, right: &Value) -> Ordering {
        if let Ok(ordering) = self.compare(left, right) {
            return ordering;
        }
        let readable = |value: &Value| self.compare(value, value).is_ok();
        match (readable(left), readable(right)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => left.to_string().cmp(&right.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pick the type two untyped values are compared as
pub(crate) fn common_type(left: DataType, right: DataType) -> DataType {
    match (left, right) {
        (l, r) if l == r => l,
        (DataType::Text, other) | (other, DataType::Text) => other,
        (DataType::Integer, DataType::Decimal) | (DataType::Decimal, DataType::Integer) => {
            DataType::Decimal
        }
        (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => {
            DataType::Timestamp
        }
        _ => DataType::Text,
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

fn compare_numbers(left: Number, right: Number) -> Ordering {
    match (left, right) {
        (Number::Int(l), Number::Int(r)) => l.cmp(&r),
        (l, r) => as_f64(l).total_cmp(&as_f64(r)),
    }
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(number: Number) -> f64 {
    match number {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
}

impl Value {
    /// Whether this value is `Null`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The type this value carries on its own
    #[must_use]
    pub const fn natural_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Unknown,
            Self::Text(_) => DataType::Text,
            Self::Integer(_) => DataType::Integer,
            Self::Decimal(_) => DataType::Decimal,
            Self::Boolean(_) => DataType::Boolean,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::Binary(_) => DataType::Binary,
        }
    }

    fn conversion_error(&self, target: DataType) -> DbCompareError {
        DbCompareError::bad_data(format!("Cannot read value '{self}' as {target}"))
    }

    fn to_number(&self, target: DataType) -> Result<Number> {
        match self {
            Self::Integer(i) => Ok(Number::Int(*i)),
            Self::Decimal(f) => Ok(Number::Float(*f)),
            Self::Boolean(b) => Ok(Number::Int(i64::from(*b))),
            Self::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .map(Number::Int)
                    .or_else(|_| trimmed.parse::<f64>().map(Number::Float))
                    .map_err(|_| self.conversion_error(target))
            }
            _ => Err(self.conversion_error(target)),
        }
    }

    fn to_boolean(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::Integer(0) => Ok(false),
            Self::Integer(1) => Ok(true),
            Self::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Ok(true),
                "false" | "f" | "no" | "n" | "0" => Ok(false),
                _ => Err(self.conversion_error(DataType::Boolean)),
            },
            _ => Err(self.conversion_error(DataType::Boolean)),
        }
    }

    fn to_timestamp(&self) -> Result<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Ok(*ts),
            Self::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Self::Integer(millis) => DateTime::<Utc>::from_timestamp_millis(*millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| self.conversion_error(DataType::Timestamp)),
            Self::Text(s) => {
                let trimmed = s.trim();
                TIMESTAMP_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                    .or_else(|| {
                        DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.naive_utc())
                    })
                    .or_else(|| {
                        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                            .ok()
                            .map(|d| d.and_time(NaiveTime::MIN))
                    })
                    .ok_or_else(|| self.conversion_error(DataType::Timestamp))
            }
            _ => Err(self.conversion_error(DataType::Timestamp)),
        }
    }

    fn to_date(&self) -> Result<NaiveDate> {
        match self {
            Self::Date(d) => Ok(*d),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .or_else(|_| self.to_timestamp().map(|ts| ts.date()))
                .map_err(|_| self.conversion_error(DataType::Date)),
            _ => self.to_timestamp().map(|ts| ts.date()),
        }
    }

    fn to_time(&self) -> Result<NaiveTime> {
        match self {
            Self::Time(t) => Ok(*t),
            Self::Timestamp(ts) => Ok(ts.time()),
            Self::Text(s) => {
                let trimmed = s.trim();
                TIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
                    .ok_or_else(|| self.conversion_error(DataType::Time))
            }
            _ => Err(self.conversion_error(DataType::Time)),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Binary(bytes) => bytes.clone(),
            Self::Text(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .unwrap_or_else(|_| s.as_bytes().to_vec()),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Binary(bytes) => {
                write!(f, "{}", base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_columns_compare_numerically() {
        let ty = DataType::Integer;
        assert!(ty.matches(&Value::from("10"), &Value::Integer(10)).unwrap());
        assert_eq!(ty.compare(&Value::from("9"), &Value::from("10")).unwrap(), Ordering::Less);
        assert!(DataType::Decimal.matches(&Value::from("1.0"), &Value::Integer(1)).unwrap());
    }

    #[test]
    fn test_text_columns_compare_lexically() {
        assert_eq!(
            DataType::Text.compare(&Value::from("9"), &Value::from("10")).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_null_equals_only_null() {
        for ty in [DataType::Text, DataType::Integer, DataType::Unknown] {
            assert!(ty.matches(&Value::Null, &Value::Null).unwrap());
            assert!(!ty.matches(&Value::Null, &Value::from("")).unwrap());
            assert!(!ty.matches(&Value::Integer(0), &Value::Null).unwrap());
        }
    }

    #[test]
    fn test_unknown_type_uses_the_typed_side() {
        assert!(DataType::Unknown.matches(&Value::from("42"), &Value::Integer(42)).unwrap());
        assert!(DataType::Unknown.matches(&Value::Integer(2), &Value::Decimal(2.0)).unwrap());
        assert!(!DataType::Unknown.matches(&Value::from("a"), &Value::from("b")).unwrap());
    }

    #[test]
    fn test_temporal_coercion() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(12, 30, 0).unwrap();
        assert!(DataType::Timestamp
            .matches(&Value::from("2024-03-01 12:30:00"), &Value::Timestamp(ts))
            .unwrap());
        assert!(DataType::Timestamp
            .matches(&Value::from("2024-03-01T12:30:00Z"), &Value::Timestamp(ts))
            .unwrap());
        assert!(DataType::Date.matches(&Value::from("2024-03-01"), &Value::Timestamp(ts)).unwrap());
        assert!(DataType::Time.matches(&Value::from("12:30"), &Value::Timestamp(ts)).unwrap());
    }

    #[test]
    fn test_lenient_comparison_orders_unreadable_values_last() {
        let ty = DataType::Integer;
        assert!(ty.compare(&Value::from("n/a"), &Value::Integer(1)).is_err());
        assert_eq!(ty.compare_lenient(&Value::from("n/a"), &Value::Integer(1)), Ordering::Greater);
        assert_eq!(ty.compare_lenient(&Value::Integer(1), &Value::from("n/a")), Ordering::Less);
        assert_eq!(ty.compare_lenient(&Value::from("n/a"), &Value::from("n/a")), Ordering::Equal);
        assert_eq!(ty.compare_lenient(&Value::from("9"), &Value::from("10")), Ordering::Less);
        assert_eq!(ty.compare_lenient(&Value::Null, &Value::from("n/a")), Ordering::Less);
    }

    #[test]
    fn test_boolean_coercion() {
        assert!(DataType::Boolean.matches(&Value::from("yes"), &Value::Boolean(true)).unwrap());
        assert!(DataType::Boolean.matches(&Value::Integer(0), &Value::from("false")).unwrap());
    }

    #[test]
    fn test_uncoercible_value_is_bad_data() {
        let err = DataType::Integer.compare(&Value::from("abc"), &Value::Integer(1)).unwrap_err();
        assert_eq!(err.error_code(), "BAD_DATA");
        assert!(err.message().contains("abc"));
    }

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(DataType::from_sql_type("INTEGER"), DataType::Integer);
        assert_eq!(DataType::from_sql_type("varchar(20)"), DataType::Text);
        assert_eq!(DataType::from_sql_type("DATETIME"), DataType::Timestamp);
        assert_eq!(DataType::from_sql_type("date"), DataType::Date);
        assert_eq!(DataType::from_sql_type("NUMERIC(10,2)"), DataType::Decimal);
        assert_eq!(DataType::from_sql_type(""), DataType::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Decimal(1.5).to_string(), "1.5");
        assert_eq!(Value::Binary(vec![1, 2, 3]).to_string(), "AQID");
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
