//! Error types for buffered cursors
//!
//! This module defines every error the cursor engine can surface, from
//! statement failures reported by a connection to decoding failures raised
//! while coercing column values.

use thiserror::Error;

use crate::constants::Oid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cursor operations
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Cursor Errors
    // =========================================================================
    /// `DECLARE` failed (bad SQL, no active transaction, ...)
    #[error("failed to open cursor {name}: {source}")]
    CursorOpen {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// `FETCH` failed (cursor expired, transaction ended, ...)
    #[error("failed to fetch from cursor {name}: {source}")]
    CursorFetch {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// `CLOSE` failed; the registry entry has been removed anyway
    #[error("failed to close cursor {name}: {source}")]
    CursorClose {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Operation on a cursor name that is not registered
    #[error("cursor {0} not open")]
    UnknownCursor(String),

    /// Cursor name is not a plain SQL identifier
    #[error("invalid cursor name: {0:?}")]
    InvalidCursorName(String),

    /// Buffer size must be at least one row
    #[error("invalid buffer size: {0} (must be at least 1)")]
    InvalidBufferSize(usize),

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// A column value could not be coerced to its declared type
    #[error("cannot decode column {column} (type {type_oid}): {message}")]
    Decode {
        column: String,
        type_oid: Oid,
        message: String,
    },

    /// A fetched row does not match the cursor's column count
    #[error("row has {actual} cells but the cursor has {expected} columns")]
    RowWidth { expected: usize, actual: usize },

    /// Low-level conversion failure
    #[error("data conversion error: {0}")]
    DataConversion(String),

    /// Placeholder count does not match the supplied parameters
    #[error("statement has {expected} placeholders but {actual} parameters were supplied")]
    ParameterCount { expected: usize, actual: usize },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Statement rejected by the database
    #[error("{}{}", code.as_ref().map(|c| format!("[{}] ", c)).unwrap_or_default(), message)]
    Statement {
        code: Option<String>,
        message: String,
    },

    /// Error reported by tokio-postgres
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    // =========================================================================
    // Caller Errors
    // =========================================================================
    /// Error returned by a row callback during iteration
    #[error("row callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Create a statement error as a database would report it
    pub fn statement(code: Option<&str>, message: impl Into<String>) -> Self {
        Error::Statement {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error raised from a row callback
    pub fn callback(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Callback(err.into())
    }

    /// Check if this error concerns the lifecycle of a named cursor
    pub fn is_cursor_error(&self) -> bool {
        matches!(
            self,
            Error::CursorOpen { .. }
                | Error::CursorFetch { .. }
                | Error::CursorClose { .. }
                | Error::UnknownCursor(_)
        )
    }

    /// Check if this is a value decoding error
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::RowWidth { .. } | Error::DataConversion(_)
        )
    }

    /// Name of the cursor this error refers to, if any
    pub fn cursor_name(&self) -> Option<&str> {
        match self {
            Error::CursorOpen { name, .. }
            | Error::CursorFetch { name, .. }
            | Error::CursorClose { name, .. }
            | Error::UnknownCursor(name)
            | Error::InvalidCursorName(name) => Some(name),
            _ => None,
        }
    }
}
