//! tokio-postgres adapter
//!
//! Implements [`Connection`] for [`tokio_postgres::Client`]. Each statement is
//! prepared so that the row description carries column type OIDs, then run
//! without parameters. Cells are read with the native decoder for their type;
//! types without one are read as text.

use bytes::Buf;
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, Row as PgRow};

use crate::connection::{Column, Connection, ResultSet};
use crate::error::{Error, Result};
use crate::row::Value;
use crate::types::Numeric;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

impl Connection for Client {
    async fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let stmt = self.prepare(sql).await.map_err(statement_error)?;
        let columns: Vec<Column> = stmt
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.type_().oid()))
            .collect();

        let rows = self.query(&stmt, &[]).await.map_err(statement_error)?;

        let mut result = ResultSet::new(columns);
        for row in &rows {
            result.push_row(row_values(row)?);
        }
        Ok(result)
    }
}

/// Keep the SQLSTATE of server errors, pass anything else through
fn statement_error(err: tokio_postgres::Error) -> Error {
    match err.as_db_error() {
        Some(db) => Error::statement(Some(db.code().code()), db.message()),
        None => Error::Postgres(err),
    }
}

fn row_values(row: &PgRow) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        let ty = col.type_();
        let value = match *ty {
            Type::BOOL => get::<bool>(row, idx, Value::Boolean),
            Type::INT2 => get::<i16>(row, idx, |v| Value::Integer(v.into())),
            Type::INT4 => get::<i32>(row, idx, |v| Value::Integer(v.into())),
            Type::INT8 => get::<i64>(row, idx, Value::Integer),
            Type::OID => get::<u32>(row, idx, |v| Value::Integer(v.into())),
            Type::FLOAT4 => get::<f32>(row, idx, |v| Value::Float(v.into())),
            Type::FLOAT8 => get::<f64>(row, idx, Value::Float),
            Type::NUMERIC => get::<PgNumeric>(row, idx, |v| Value::Number(v.0)),
            Type::BYTEA => get::<Vec<u8>>(row, idx, Value::from),
            Type::DATE => get::<PgDate>(row, idx, |v| v.0),
            Type::TIMESTAMP | Type::TIMESTAMPTZ => get::<PgTimestamp>(row, idx, |v| v.0),
            _ => get::<PgText>(row, idx, |v| Value::String(v.0)),
        }
        .map_err(|e| Error::Decode {
            column: col.name().to_string(),
            type_oid: ty.oid(),
            message: e.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

fn get<'a, T: FromSql<'a>>(
    row: &'a PgRow,
    idx: usize,
    wrap: impl FnOnce(T) -> Value,
) -> std::result::Result<Value, tokio_postgres::Error> {
    row.try_get::<_, Option<T>>(idx)
        .map(|val| val.map(wrap).unwrap_or(Value::Null))
}

/// Days (`date`) and microseconds (timestamps) are counted from 2000-01-01
fn pg_epoch() -> std::result::Result<NaiveDateTime, BoxError> {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| "invalid epoch".into())
}

/// Binary `date`; the infinity sentinels come out as text
struct PgDate(Value);

impl<'a> FromSql<'a> for PgDate {
    fn from_sql(_ty: &Type, mut raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        if raw.len() != 4 {
            return Err(format!("binary date requires 4 bytes, got {}", raw.len()).into());
        }
        let value = match raw.get_i32() {
            i32::MAX => Value::from("infinity"),
            i32::MIN => Value::from("-infinity"),
            days => pg_epoch()?
                .date()
                .checked_add_signed(Duration::days(days.into()))
                .map(Value::Date)
                .ok_or("date out of range")?,
        };
        Ok(PgDate(value))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::DATE
    }
}

/// Binary `timestamp` / `timestamptz`; the infinity sentinels come out as text
struct PgTimestamp(Value);

impl<'a> FromSql<'a> for PgTimestamp {
    fn from_sql(ty: &Type, mut raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        if raw.len() != 8 {
            return Err(format!("binary timestamp requires 8 bytes, got {}", raw.len()).into());
        }
        let micros = match raw.get_i64() {
            i64::MAX => return Ok(PgTimestamp(Value::from("infinity"))),
            i64::MIN => return Ok(PgTimestamp(Value::from("-infinity"))),
            micros => micros,
        };
        let naive = pg_epoch()?
            .checked_add_signed(Duration::microseconds(micros))
            .ok_or("timestamp out of range")?;

        let value = if *ty == Type::TIMESTAMPTZ {
            Value::TimestampTz(Utc.from_utc_datetime(&naive).fixed_offset())
        } else {
            Value::Timestamp(naive)
        };
        Ok(PgTimestamp(value))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIMESTAMP || *ty == Type::TIMESTAMPTZ
    }
}

/// Binary `numeric`
struct PgNumeric(Numeric);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(PgNumeric(Numeric::from_binary(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Any type whose binary form is UTF-8 text (`text`, `json`, `xml`, enums, ...)
struct PgText(String);

impl<'a> FromSql<'a> for PgText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        // jsonb is prefixed by a format version byte
        let raw = match raw.split_first() {
            Some((&1, rest)) if *ty == Type::JSONB => rest,
            _ => raw,
        };
        Ok(PgText(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
