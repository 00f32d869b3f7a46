//! Row data handling for cursor results
//!
//! This module provides types and functions for:
//! - Representing column values in a type-safe manner
//! - Representing a decoded row as an ordered column name to value map
//! - Decoding raw result rows using cached column metadata

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::coerce::CoercionTable;
use crate::connection::Column;
use crate::error::{Error, Result};
use crate::types::{format_timestamp, format_timestamptz, Numeric};

/// Represents a value from a PostgreSQL column.
///
/// Connections produce values in whatever shape their driver yields (often
/// [`Value::String`] for text-protocol drivers); the coercion table then
/// turns them into their native form.
///
/// # Example
///
/// ```rust
/// use pgcursor::Value;
///
/// fn describe(value: &Value) -> String {
///     match value {
///         Value::Null => "NULL".to_string(),
///         Value::String(s) => format!("text {}", s),
///         Value::Integer(i) => format!("integer {}", i),
///         other => format!("other {}", other),
///     }
/// }
///
/// assert_eq!(describe(&Value::Integer(7)), "integer 7");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (int2, int4, int8, oid)
    Integer(i64),
    /// Floating point value (float4, float8)
    Float(f64),
    /// Exact decimal value (numeric)
    Number(Numeric),
    /// Text value (text, varchar, char, and anything left uncoerced)
    String(String),
    /// Binary value (bytea)
    Bytes(Bytes),
    /// Calendar date
    Date(NaiveDate),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// Timestamp with time zone
    TimestampTz(DateTime<FixedOffset>),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) => n.to_i64().ok(),
            _ => None,
        }
    }

    /// Try to get as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => n.to_f64().ok(),
            _ => None,
        }
    }

    /// Try to get as an exact decimal
    pub fn as_numeric(&self) -> Option<&Numeric> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Try to get as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Try to get as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as a date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as a timestamp without time zone
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Try to get as a timestamp with time zone
    pub fn as_timestamptz(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::TimestampTz(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Number(_) => "numeric",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<Numeric> for Value {
    fn from(v: Numeric) -> Self {
        Value::Number(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::TimestampTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
            Value::TimestampTz(ts) => write!(f, "{}", format_timestamptz(ts)),
        }
    }
}

/// A decoded row: column names, in query order, mapped to values.
///
/// # Example
///
/// ```rust
/// use pgcursor::{Row, Value};
///
/// let row = Row::from_iter([("id", Value::Integer(1)), ("name", Value::from("alice"))]);
///
/// assert_eq!(row.get("id").and_then(Value::as_i64), Some(1));
/// assert_eq!(row.get("NAME").and_then(Value::as_str), Some("alice"));
/// assert_eq!(row.columns().collect::<Vec<_>>(), ["id", "name"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row with room for `columns` fields
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(columns),
        }
    }

    /// Append a field; a repeated column name replaces the earlier value
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Get the number of columns in this row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get a value by column name: exact match first, then ASCII case-insensitive
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Get a value by column position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.fields.get_index(index).map(|(_, value)| value)
    }

    /// Check if the row has a column with this name
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names, in query order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Values, in query order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    /// Iterate over `(column, value)` pairs in query order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Try to get a string value by column name
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Try to get an integer value by column name
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Check if a column value is NULL (missing columns count as NULL)
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).map(Value::is_null).unwrap_or(true)
    }

    /// Consume the row and return the underlying ordered map
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl std::ops::Index<&str> for Row {
    type Output = Value;

    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no column named {:?} in row", name),
        }
    }
}

/// Decoder turning raw result rows into [`Row`]s
pub struct RowDecoder<'a> {
    columns: &'a [Column],
    coercions: &'a CoercionTable,
}

impl<'a> RowDecoder<'a> {
    /// Create a new row decoder over cached column metadata
    pub fn new(columns: &'a [Column], coercions: &'a CoercionTable) -> Self {
        Self { columns, coercions }
    }

    /// Decode a single raw row, coercing each cell by its column's type
    pub fn decode_row(&self, raw: Vec<Value>) -> Result<Row> {
        if raw.len() != self.columns.len() {
            return Err(Error::RowWidth {
                expected: self.columns.len(),
                actual: raw.len(),
            });
        }

        let mut row = Row::with_capacity(self.columns.len());
        for (column, cell) in self.columns.iter().zip(raw) {
            let value = self
                .coercions
                .coerce(column.type_oid, cell)
                .map_err(|e| Error::Decode {
                    column: column.name.clone(),
                    type_oid: column.type_oid,
                    message: match e {
                        Error::DataConversion(message) => message,
                        other => other.to_string(),
                    },
                })?;
            row.insert(column.name.clone(), value);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::oid;

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert!(v.is_null());
        assert!(v.as_str().is_none());
        assert!(v.as_i64().is_none());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::Integer(42).as_f64(), Some(42.0));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(
            Value::Number(Numeric::parse("12.000").unwrap()).as_i64(),
            Some(12)
        );
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Null), "NULL");
        assert_eq!(format!("{}", Value::Integer(42)), "42");
        assert_eq!(format!("{}", Value::String("test".into())), "test");
        assert_eq!(format!("{}", Value::Boolean(true)), "true");
        assert_eq!(format!("{}", Value::from(vec![1u8, 2, 3])), "<3 bytes>");
        assert_eq!(
            format!("{}", Value::Number(Numeric::parse("1.50").unwrap())),
            "1.50"
        );
    }

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::from_iter([
            ("zeta", Value::Integer(1)),
            ("alpha", Value::Integer(2)),
            ("mid", Value::Integer(3)),
        ]);
        assert_eq!(row.columns().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        assert_eq!(row.get_index(1), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_row_lookup_is_case_insensitive() {
        let row = Row::from_iter([("UserId", Value::Integer(7)), ("userid", Value::Integer(8))]);
        assert_eq!(row.get_i64("userid"), Some(8)); // exact match wins
        assert_eq!(row.get_i64("UserId"), Some(7));
        assert_eq!(row.get_i64("USERID"), Some(7));
        assert!(row.get("missing").is_none());
        assert!(row.is_null("missing"));
    }

    #[test]
    fn test_row_index() {
        let row = Row::from_iter([("n", Value::Integer(42))]);
        assert_eq!(row["n"], Value::Integer(42));
    }

    #[test]
    fn test_decode_row_coerces_by_column_type() {
        let columns = vec![
            Column::new("id", oid::INT4),
            Column::new("payload", oid::BYTEA),
            Column::new("amount", oid::NUMERIC),
        ];
        let coercions = CoercionTable::default();
        let decoder = RowDecoder::new(&columns, &coercions);

        let row = decoder
            .decode_row(vec![
                Value::Integer(1),
                Value::from("\\x0102"),
                Value::from("19.99"),
            ])
            .unwrap();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_i64("id"), Some(1));
        assert_eq!(row.get("payload").and_then(Value::as_bytes), Some(&[1u8, 2][..]));
        assert_eq!(
            row.get("amount").and_then(Value::as_numeric),
            Some(&Numeric::parse("19.99").unwrap())
        );
    }

    #[test]
    fn test_decode_row_reports_column_on_failure() {
        let columns = vec![Column::new("created_at", oid::TIMESTAMP)];
        let coercions = CoercionTable::default();
        let decoder = RowDecoder::new(&columns, &coercions);

        let err = decoder.decode_row(vec![Value::from("not a time")]).unwrap_err();
        match err {
            Error::Decode { column, type_oid, .. } => {
                assert_eq!(column, "created_at");
                assert_eq!(type_oid, oid::TIMESTAMP);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_row_rejects_width_mismatch() {
        let columns = vec![Column::new("a", oid::INT4), Column::new("b", oid::INT4)];
        let coercions = CoercionTable::default();
        let decoder = RowDecoder::new(&columns, &coercions);
        let err = decoder.decode_row(vec![Value::Integer(1)]).unwrap_err();
        assert!(err.is_decode_error());
        assert!(matches!(err, Error::RowWidth { expected: 2, actual: 1 }));
        assert_eq!(err.to_string(), "row has 1 cells but the cursor has 2 columns");
    }
}
