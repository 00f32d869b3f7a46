//! Cursor iteration options
//!
//! [`CursorOptions`] bundles the cursor name, the number of rows per fetch
//! and whether the iteration helper wraps its work in a transaction.

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_CURSOR_NAME};
use crate::cursor::validate_cursor_name;
use crate::error::{Error, Result};

/// Options for [`CursorEngine::iterate`](crate::CursorEngine::iterate).
///
/// # Examples
///
/// ```rust
/// use pgcursor::CursorOptions;
///
/// let options = CursorOptions::new()
///     .with_name("export")
///     .with_buffer_size(500)
///     .with_transaction(false);
///
/// assert_eq!(options.name, "export");
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorOptions {
    /// Cursor name used in `DECLARE` / `FETCH` / `CLOSE`
    pub name: String,
    /// Rows requested by each `FETCH`
    pub buffer_size: usize,
    /// Wrap the iteration in `BEGIN` / `COMMIT` (rolled back on failure)
    pub use_transaction: bool,
}

impl CursorOptions {
    /// Create options with the defaults (`csr`, 10 000 rows, transactional)
    pub fn new() -> Self {
        Self {
            name: DEFAULT_CURSOR_NAME.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            use_transaction: true,
        }
    }

    /// Set the cursor name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the rows requested by each fetch
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set whether the iteration runs in its own transaction
    pub fn with_transaction(mut self, use_transaction: bool) -> Self {
        self.use_transaction = use_transaction;
        self
    }

    /// Check the name and buffer size
    pub fn validate(&self) -> Result<()> {
        validate_cursor_name(&self.name)?;
        if self.buffer_size == 0 {
            return Err(Error::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CursorOptions::default();
        assert_eq!(options.name, "csr");
        assert_eq!(options.buffer_size, 10_000);
        assert!(options.use_transaction);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let err = CursorOptions::new().with_buffer_size(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidBufferSize(0)));
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let err = CursorOptions::new()
            .with_name("x; CLOSE ALL")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCursorName(_)));
    }
}
