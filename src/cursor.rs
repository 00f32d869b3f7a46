//! Buffered cursor state
//!
//! A [`CursorState`] tracks one named server-side cursor: the statement it
//! was declared for, the rows fetched but not yet handed out, and where it
//! stands in its lifecycle:
//!
//! ```text
//! Empty --fetch (rows)--> Buffered --last row taken--> Empty --fetch (none)--> Eof
//! ```

use std::collections::VecDeque;
use std::fmt;

use crate::connection::Column;
use crate::constants::MAX_IDENTIFIER_LENGTH;
use crate::error::{Error, Result};
use crate::row::Value;

/// Lifecycle phase of a buffered cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The buffer needs a refill before the next row can be handed out
    Empty,
    /// Rows are available locally
    Buffered,
    /// The server has no more rows for this cursor
    Eof,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Empty => write!(f, "empty"),
            Phase::Buffered => write!(f, "buffered"),
            Phase::Eof => write!(f, "eof"),
        }
    }
}

/// State of one open cursor
#[derive(Debug, Clone)]
pub struct CursorState {
    name: String,
    sql: String,
    buffer_size: usize,
    phase: Phase,
    buffer: VecDeque<Vec<Value>>,
    /// Resolved from the first non-empty fetch, then fixed
    columns: Option<Vec<Column>>,
    fetches: u64,
    dispensed: u64,
}

impl CursorState {
    /// Create the state of a freshly declared cursor
    pub fn new(name: impl Into<String>, sql: impl Into<String>, buffer_size: usize) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            buffer_size,
            phase: Phase::Empty,
            buffer: VecDeque::new(),
            columns: None,
            fetches: 0,
            dispensed: 0,
        }
    }

    /// Cursor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statement the cursor was declared for
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Rows requested by each fetch
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Rows fetched but not yet handed out
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of fetches issued so far
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Number of rows handed out so far
    pub fn dispensed(&self) -> u64 {
        self.dispensed
    }

    /// Column metadata, once resolved
    pub fn columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    /// Column names, once resolved
    pub fn field_names(&self) -> Option<Vec<&str>> {
        self.columns
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.name.as_str()).collect())
    }

    /// Load the rows of a completed fetch.
    ///
    /// Only valid while `Empty`; moves to `Buffered`, or to `Eof` when the
    /// fetch returned nothing.
    pub(crate) fn load(&mut self, columns: Vec<Column>, rows: Vec<Vec<Value>>) {
        debug_assert_eq!(self.phase, Phase::Empty);
        self.fetches += 1;

        if rows.is_empty() {
            self.phase = Phase::Eof;
            return;
        }

        if self.columns.is_none() {
            self.columns = Some(columns);
        }
        self.buffer = rows.into();
        self.phase = Phase::Buffered;
    }

    /// Take the next buffered row.
    ///
    /// Returns `None` unless `Buffered`. Taking the last row moves the cursor
    /// back to `Empty` so that the next request triggers a refill.
    pub(crate) fn take_next(&mut self) -> Option<Vec<Value>> {
        if self.phase != Phase::Buffered {
            return None;
        }
        if self.buffer.len() <= 1 {
            self.phase = Phase::Empty;
        }
        let row = self.buffer.pop_front();
        if row.is_some() {
            self.dispensed += 1;
        }
        row
    }
}

/// Check that a cursor name is a plain SQL identifier.
///
/// Cursor names are spliced into `DECLARE`, `FETCH` and `CLOSE` statements,
/// so only letters, digits, `_` and `$` are allowed, starting with a letter
/// or underscore.
pub fn validate_cursor_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LENGTH {
        Ok(())
    } else {
        Err(Error::InvalidCursorName(name.to_string()))
    }
}
