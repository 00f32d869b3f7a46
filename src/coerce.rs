//! Column value coercion
//!
//! A [`CoercionTable`] maps type OIDs to functions turning a raw cell into its
//! native [`Value`]. Types without an entry pass through unchanged, as does
//! NULL. The default table covers `bytea`, `timestamp`, `timestamptz` and
//! `numeric`; [`CoercionTable::with_text_scalars`] adds the scalar types a
//! text-protocol driver leaves as strings.

use std::collections::HashMap;

use crate::constants::{oid, Oid};
use crate::error::{Error, Result};
use crate::row::Value;
use crate::types::{
    is_infinity, parse_date, parse_timestamp, parse_timestamptz, unescape_bytea, Numeric,
};

/// A coercion from a raw cell to its native value
pub type Coercer = fn(Value) -> Result<Value>;

/// Type OID to coercion function table
#[derive(Debug, Clone)]
pub struct CoercionTable {
    coercers: HashMap<Oid, Coercer>,
}

impl CoercionTable {
    /// Create a table with no entries: every value passes through
    pub fn empty() -> Self {
        Self {
            coercers: HashMap::new(),
        }
    }

    /// Create the standard table (`bytea`, timestamps, `numeric`)
    pub fn new() -> Self {
        Self::empty()
            .with(oid::BYTEA, coerce_bytea)
            .with(oid::TIMESTAMP, coerce_timestamp)
            .with(oid::TIMESTAMPTZ, coerce_timestamptz)
            .with(oid::NUMERIC, coerce_numeric)
    }

    /// Add coercions for scalars delivered as text (`bool`, integers, floats, `date`)
    pub fn with_text_scalars(self) -> Self {
        self.with(oid::BOOL, coerce_bool)
            .with(oid::INT2, coerce_integer)
            .with(oid::INT4, coerce_integer)
            .with(oid::INT8, coerce_integer)
            .with(oid::OID, coerce_integer)
            .with(oid::FLOAT4, coerce_float)
            .with(oid::FLOAT8, coerce_float)
            .with(oid::DATE, coerce_date)
    }

    /// Register a coercion, builder style
    pub fn with(mut self, type_oid: Oid, coercer: Coercer) -> Self {
        self.register(type_oid, coercer);
        self
    }

    /// Register a coercion, returning the one it replaces
    pub fn register(&mut self, type_oid: Oid, coercer: Coercer) -> Option<Coercer> {
        self.coercers.insert(type_oid, coercer)
    }

    /// Remove the coercion for a type, making it pass through
    pub fn remove(&mut self, type_oid: Oid) -> Option<Coercer> {
        self.coercers.remove(&type_oid)
    }

    /// Check if a type has a registered coercion
    pub fn contains(&self, type_oid: Oid) -> bool {
        self.coercers.contains_key(&type_oid)
    }

    /// Coerce a raw cell of the given type
    pub fn coerce(&self, type_oid: Oid, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self.coercers.get(&type_oid) {
            Some(coercer) => coercer(value),
            None => Ok(value),
        }
    }
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `bytea`: unescape text, keep bytes
pub fn coerce_bytea(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => unescape_bytea(&text).map(Value::Bytes),
        Value::Bytes(_) => Ok(value),
        other => Err(unexpected("bytea", &other)),
    }
}

/// `timestamp`: parse text, keep native timestamps
pub fn coerce_timestamp(value: Value) -> Result<Value> {
    match value {
        Value::String(text) if is_infinity(&text) => Ok(Value::String(text)),
        Value::String(text) => parse_timestamp(&text).map(Value::Timestamp),
        Value::Timestamp(_) => Ok(value),
        other => Err(unexpected("timestamp", &other)),
    }
}

/// `timestamptz`: parse text, keep native timestamps
pub fn coerce_timestamptz(value: Value) -> Result<Value> {
    match value {
        Value::String(text) if is_infinity(&text) => Ok(Value::String(text)),
        Value::String(text) => parse_timestamptz(&text).map(Value::TimestampTz),
        Value::TimestampTz(_) => Ok(value),
        other => Err(unexpected("timestamptz", &other)),
    }
}

/// `numeric`: parse text; anything else passes through
pub fn coerce_numeric(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => Numeric::parse(&text).map(Value::Number),
        other => Ok(other),
    }
}

/// `bool`: `t` / `f` as the server prints them
pub fn coerce_bool(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "f" | "false" | "n" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            _ => Err(Error::DataConversion(format!("invalid boolean {:?}", text))),
        },
        other => Ok(other),
    }
}

/// Integer types
pub fn coerce_integer(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| Error::DataConversion(format!("invalid integer {:?}: {}", text, e))),
        other => Ok(other),
    }
}

/// Floating point types, including `NaN` and `Infinity`
pub fn coerce_float(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            let parsed = match trimmed {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                _ => trimmed.parse::<f64>(),
            };
            parsed
                .map(Value::Float)
                .map_err(|e| Error::DataConversion(format!("invalid float {:?}: {}", text, e)))
        }
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        other => Ok(other),
    }
}

/// `date`: parse text, keep native dates
pub fn coerce_date(value: Value) -> Result<Value> {
    match value {
        Value::String(text) if is_infinity(&text) => Ok(Value::String(text)),
        Value::String(text) => parse_date(&text).map(Value::Date),
        other => Ok(other),
    }
}

fn unexpected(type_name: &str, value: &Value) -> Error {
    Error::DataConversion(format!(
        "cannot read a {} value as {}",
        value.kind(),
        type_name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_unknown_types_pass_through() {
        let table = CoercionTable::default();
        let value = Value::from("{\"a\": 1}");
        assert_eq!(table.coerce(oid::JSON, value.clone()).unwrap(), value);
        assert_eq!(table.coerce(oid::INT4, Value::from("12")).unwrap(), Value::from("12"));
    }

    #[test]
    fn test_null_is_never_coerced() {
        let table = CoercionTable::default().with_text_scalars();
        for type_oid in [oid::BYTEA, oid::TIMESTAMP, oid::NUMERIC, oid::BOOL] {
            assert_eq!(table.coerce(type_oid, Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_bytea() {
        let table = CoercionTable::default();
        let value = table.coerce(oid::BYTEA, Value::from("\\x00ff10")).unwrap();
        assert_eq!(value.as_bytes(), Some(&[0x00u8, 0xff, 0x10][..]));

        let raw = Value::from(vec![9u8, 8]);
        assert_eq!(table.coerce(oid::BYTEA, raw.clone()).unwrap(), raw);
        assert!(table.coerce(oid::BYTEA, Value::from("\\xgg")).is_err());
        assert!(table.coerce(oid::BYTEA, Value::Integer(1)).is_err());
    }

    #[test]
    fn test_timestamps() {
        let table = CoercionTable::default();
        let ts = table
            .coerce(oid::TIMESTAMP, Value::from("2024-03-15 14:30:45.5"))
            .unwrap()
            .as_timestamp()
            .unwrap();
        assert_eq!(ts.nanosecond(), 500_000_000);

        let tz = table
            .coerce(oid::TIMESTAMPTZ, Value::from("2024-03-15 14:30:45+01"))
            .unwrap()
            .as_timestamptz()
            .unwrap();
        assert_eq!(tz.offset().local_minus_utc(), 3600);

        assert_eq!(
            table.coerce(oid::TIMESTAMP, Value::from("infinity")).unwrap(),
            Value::from("infinity")
        );
        assert!(table.coerce(oid::TIMESTAMPTZ, Value::from("soon")).is_err());
    }

    #[test]
    fn test_numeric() {
        let table = CoercionTable::default();
        let value = table.coerce(oid::NUMERIC, Value::from("1234.5678")).unwrap();
        assert_eq!(value, Value::Number(Numeric::parse("1234.5678").unwrap()));
        // Already native values pass through
        assert_eq!(table.coerce(oid::NUMERIC, Value::Float(1.5)).unwrap(), Value::Float(1.5));
        assert!(table.coerce(oid::NUMERIC, Value::from("12,5")).is_err());
    }

    #[test]
    fn test_text_scalars() {
        let table = CoercionTable::default().with_text_scalars();
        assert_eq!(table.coerce(oid::BOOL, Value::from("t")).unwrap(), Value::Boolean(true));
        assert_eq!(table.coerce(oid::BOOL, Value::from("f")).unwrap(), Value::Boolean(false));
        assert_eq!(table.coerce(oid::INT8, Value::from("-42")).unwrap(), Value::Integer(-42));
        assert_eq!(table.coerce(oid::FLOAT8, Value::from("2.5")).unwrap(), Value::Float(2.5));
        assert!(table
            .coerce(oid::FLOAT4, Value::from("NaN"))
            .unwrap()
            .as_f64()
            .unwrap()
            .is_nan());
        assert_eq!(
            table.coerce(oid::DATE, Value::from("2024-02-29")).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(table.coerce(oid::INT4, Value::from("4.2")).is_err());
        assert!(table.coerce(oid::BOOL, Value::from("maybe")).is_err());
    }

    #[test]
    fn test_register_and_remove() {
        fn shout(value: Value) -> Result<Value> {
            Ok(match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
        }

        let mut table = CoercionTable::empty();
        assert!(!table.contains(oid::TEXT));
        assert!(table.register(oid::TEXT, shout).is_none());
        assert_eq!(table.coerce(oid::TEXT, Value::from("hi")).unwrap(), Value::from("HI"));
        assert!(table.remove(oid::TEXT).is_some());
        assert_eq!(table.coerce(oid::TEXT, Value::from("hi")).unwrap(), Value::from("hi"));
    }
}
