//! Positional parameter substitution
//!
//! Replaces each `?` placeholder in a statement with a quoted SQL literal.
//! A `?` is left alone inside string literals (including `E'...'` with
//! backslash escapes), quoted identifiers, dollar-quoted bodies, and `--` or
//! `/* */` comments.
//!
//! ```rust
//! use pgcursor::params::substitute;
//! use pgcursor::Value;
//!
//! let sql = substitute(
//!     "SELECT * FROM users WHERE name = ? AND note <> '?' AND id > ?",
//!     &[Value::from("O'Brien"), Value::Integer(10)],
//! ).unwrap();
//!
//! assert_eq!(sql, "SELECT * FROM users WHERE name = 'O''Brien' AND note <> '?' AND id > 10");
//! ```

use crate::error::{Error, Result};
use crate::row::Value;
use crate::types::{escape_bytea, format_timestamp, format_timestamptz};

/// Count the `?` placeholders outside quoted text
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |piece| {
        if let Piece::Placeholder = piece {
            count += 1;
        }
    });
    count
}

/// Replace every placeholder with the matching parameter, in order
pub fn substitute(sql: &str, params: &[Value]) -> Result<String> {
    let expected = count_placeholders(sql);
    if expected != params.len() {
        return Err(Error::ParameterCount {
            expected,
            actual: params.len(),
        });
    }

    let mut literals = Vec::with_capacity(params.len());
    for param in params {
        literals.push(quote_literal(param)?);
    }

    let mut out = String::with_capacity(sql.len() + literals.iter().map(String::len).sum::<usize>());
    let mut literals = literals.into_iter();
    scan(sql, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Placeholder => {
            if let Some(literal) = literals.next() {
                out.push_str(&literal);
            }
        }
    });
    Ok(out)
}

/// Render a value as a SQL literal
pub fn quote_literal(value: &Value) -> Result<String> {
    let literal = match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(true) => "TRUE".to_string(),
        Value::Boolean(false) => "FALSE".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => "'NaN'::float8".to_string(),
        Value::Float(f) if f.is_infinite() => {
            if f.is_sign_positive() {
                "'Infinity'::float8".to_string()
            } else {
                "'-Infinity'::float8".to_string()
            }
        }
        Value::Float(f) => f.to_string(),
        Value::Number(n) if n.is_nan() || n.is_infinite() => {
            format!("{}::numeric", quote_text(&n.normalized())?)
        }
        Value::Number(n) => n.normalized(),
        Value::String(s) => quote_text(s)?,
        Value::Bytes(b) => format!("{}::bytea", quote_text(&escape_bytea(b))?),
        Value::Date(d) => format!("'{}'::date", d),
        Value::Timestamp(ts) => format!("'{}'::timestamp", format_timestamp(ts)),
        Value::TimestampTz(ts) => format!("'{}'::timestamptz", format_timestamptz(ts)),
    };
    Ok(literal)
}

/// Quote a string literal, doubling embedded single quotes
fn quote_text(text: &str) -> Result<String> {
    if text.contains('\0') {
        return Err(Error::DataConversion(
            "string literals cannot contain NUL characters".to_string(),
        ));
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    Ok(quoted)
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder,
}

/// Split `sql` into literal text and placeholders
fn scan<'a>(sql: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let bytes = sql.as_bytes();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        pos = match bytes[pos] {
            b'?' => {
                emit(Piece::Text(&sql[start..pos]));
                emit(Piece::Placeholder);
                start = pos + 1;
                pos + 1
            }
            b'\'' => {
                let escapes = pos > 0
                    && matches!(bytes[pos - 1], b'E' | b'e')
                    && (pos < 2 || !is_ident_byte(bytes[pos - 2]));
                skip_quoted(bytes, pos, b'\'', escapes)
            }
            b'"' => skip_quoted(bytes, pos, b'"', false),
            b'-' if bytes.get(pos + 1) == Some(&b'-') => skip_line_comment(bytes, pos),
            b'/' if bytes.get(pos + 1) == Some(&b'*') => skip_block_comment(bytes, pos),
            b'$' => skip_dollar_quoted(sql, pos),
            _ => pos + 1,
        };
    }
    emit(Piece::Text(&sql[start..]));
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Position just past the quoted text opened at `open`. A doubled quote is an
/// escaped quote; with `escapes`, so is a backslash followed by anything.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8, escapes: bool) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if escapes && b == b'\\' {
            i += 2;
        } else if b == quote && bytes.get(i + 1) == Some(&quote) {
            i += 2;
        } else if b == quote {
            return i + 1;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], open: usize) -> usize {
    bytes[open..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|off| open + off + 1)
        .unwrap_or(bytes.len())
}

/// Block comments nest
fn skip_block_comment(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(b'/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `$tag$ ... $tag$`; a `$` inside an identifier or before a digit is not a
/// quote
fn skip_dollar_quoted(sql: &str, open: usize) -> usize {
    let bytes = sql.as_bytes();
    if open > 0 && is_ident_byte(bytes[open - 1]) {
        return open + 1;
    }

    let mut end = open + 1;
    if matches!(bytes.get(end), Some(b) if b.is_ascii_alphabetic() || *b == b'_') {
        while matches!(bytes.get(end), Some(b) if b.is_ascii_alphanumeric() || *b == b'_') {
            end += 1;
        }
    }
    if bytes.get(end) != Some(&b'$') {
        return open + 1;
    }

    let tag = &sql[open..=end];
    match sql[end + 1..].find(tag) {
        Some(off) => end + 1 + off + tag.len(),
        None => bytes.len(),
    }
}
