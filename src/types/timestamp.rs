//! PostgreSQL date and timestamp text parsing
//!
//! With the default `DateStyle = ISO`, the server renders:
//! - `date` as `2024-03-15`
//! - `timestamp` as `2024-03-15 14:30:45.123456`
//! - `timestamptz` as `2024-03-15 14:30:45.123456+05:30`
//!
//! Fractional seconds are optional. Offsets may be `+HH`, `+HH:MM` or
//! `+HH:MM:SS`. Dates before year 1 carry a trailing ` BC`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Check for the special `infinity` / `-infinity` values
pub fn is_infinity(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("infinity")
        || text.eq_ignore_ascii_case("+infinity")
        || text.eq_ignore_ascii_case("-infinity")
}

/// Strip a trailing ` BC` era marker
fn split_era(text: &str) -> (&str, bool) {
    match text.strip_suffix(" BC") {
        Some(rest) => (rest, true),
        None => (text, false),
    }
}

/// Year `n` BC is astronomical year `1 - n`
fn apply_era<T: Datelike>(value: T, bc: bool) -> Result<T> {
    if !bc {
        return Ok(value);
    }
    let year = 1 - value.year();
    value
        .with_year(year)
        .ok_or_else(|| Error::DataConversion(format!("year {} out of range", year)))
}

/// Parse a `date` value
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let (body, bc) = split_era(text.trim());
    let date = NaiveDate::parse_from_str(body, DATE_FORMAT)
        .map_err(|e| Error::DataConversion(format!("invalid date {:?}: {}", text, e)))?;
    apply_era(date, bc)
}

/// Parse a `timestamp` (without time zone) value
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let (body, bc) = split_era(text.trim());
    let naive = parse_naive(body)
        .ok_or_else(|| Error::DataConversion(format!("invalid timestamp {:?}", text)))?;
    apply_era(naive, bc)
}

/// Parse a `timestamptz` value; a value without an offset is read as UTC
pub fn parse_timestamptz(text: &str) -> Result<DateTime<FixedOffset>> {
    let (body, bc) = split_era(text.trim());
    let (local, offset) = split_offset(body)
        .ok_or_else(|| Error::DataConversion(format!("invalid time zone offset in {:?}", text)))?;
    let naive = parse_naive(local)
        .ok_or_else(|| Error::DataConversion(format!("invalid timestamp {:?}", text)))?;
    let naive = apply_era(naive, bc)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::DataConversion(format!("timestamp {:?} out of range", text)))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Split `2024-03-15 14:30:45+05:30` into the local part and its offset.
///
/// Returns `None` if an offset is present but malformed.
fn split_offset(text: &str) -> Option<(&str, FixedOffset)> {
    // The sign of an offset can only appear after the time part starts,
    // which skips the dashes of the date.
    let time_start = text.find([' ', 'T']).map(|i| i + 1).unwrap_or(text.len());
    let sign_pos = match text[time_start..].find(['+', '-']) {
        Some(pos) => time_start + pos,
        None => {
            let local = text.strip_suffix('Z').unwrap_or(text);
            return Some((local, FixedOffset::east_opt(0)?));
        }
    };

    let (local, offset) = text.split_at(sign_pos);
    let negative = offset.starts_with('-');
    let mut seconds = 0i32;
    for (idx, part) in offset[1..].split(':').enumerate() {
        if idx > 2 || part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: i32 = part.parse().ok()?;
        seconds += match idx {
            0 => value * 3600,
            1 => value * 60,
            _ => value,
        };
    }

    let seconds = if negative { -seconds } else { seconds };
    Some((local, FixedOffset::east_opt(seconds)?))
}

/// Format a timestamp in the ISO text form the server accepts
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// Format a timestamp with its offset in the ISO text form
pub fn format_timestamptz(value: &DateTime<FixedOffset>) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()
}
