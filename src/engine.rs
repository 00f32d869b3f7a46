//! Cursor engine
//!
//! [`CursorEngine`] owns a [`Connection`] together with the registry of the
//! cursors declared on it. Each named cursor is driven through
//! `DECLARE` / `FETCH n` / `CLOSE` statements and hands rows out one at a time
//! from a local buffer, refilling it only when it runs dry.
//!
//! # Example
//!
//! ```rust
//! use pgcursor::{Column, Connection, CursorEngine, MemoryConnection, ResultSet, Value, oid};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut users = ResultSet::new(vec![Column::new("name", oid::TEXT)]);
//! users.push_row(vec![Value::from("alice")]);
//! users.push_row(vec![Value::from("bob")]);
//!
//! let conn = MemoryConnection::new().with_query("SELECT name FROM users", users);
//! let mut engine = CursorEngine::new(conn);
//!
//! engine.connection_mut().begin().await?;
//! engine.open_cursor("SELECT name FROM users", "users", 1).await?;
//! while let Some(row) = engine.fetch_cursor("users").await? {
//!     println!("{}", row["name"]);
//! }
//! engine.close_cursor("users").await?;
//! engine.connection_mut().commit().await?;
//! # Ok::<(), pgcursor::Error>(())
//! # }).unwrap();
//! ```

use crate::coerce::CoercionTable;
use crate::connection::Connection;
use crate::cursor::{validate_cursor_name, CursorState, Phase};
use crate::error::{Error, Result};
use crate::params;
use crate::registry::CursorRegistry;
use crate::row::{Row, RowDecoder, Value};

/// Buffered server-side cursors over one connection
#[derive(Debug)]
pub struct CursorEngine<C: Connection> {
    conn: C,
    registry: CursorRegistry,
    coercions: CoercionTable,
}

impl<C: Connection> CursorEngine<C> {
    /// Create an engine with the default coercion table
    pub fn new(conn: C) -> Self {
        Self::with_coercions(conn, CoercionTable::default())
    }

    /// Create an engine with a custom coercion table
    pub fn with_coercions(conn: C, coercions: CoercionTable) -> Self {
        Self {
            conn,
            registry: CursorRegistry::new(),
            coercions,
        }
    }

    /// Declare a cursor named `name` for `sql`.
    ///
    /// Must be called inside a transaction. A cursor already registered under
    /// `name` is closed first.
    pub async fn open_cursor(&mut self, sql: &str, name: &str, buffer_size: usize) -> Result<()> {
        validate_cursor_name(name)?;
        if buffer_size == 0 {
            return Err(Error::InvalidBufferSize(buffer_size));
        }

        if self.registry.remove(name).is_some() {
            if let Err(e) = self.conn.execute(&format!("CLOSE {}", name)).await {
                tracing::warn!(cursor = name, error = %e, "Failed to close cursor before reopening");
            }
        }

        self.conn
            .execute(&format!("DECLARE {} CURSOR FOR {}", name, sql))
            .await
            .map_err(|e| Error::CursorOpen {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        self.registry.insert(CursorState::new(name, sql, buffer_size));
        tracing::debug!(cursor = name, buffer_size = buffer_size, sql = sql, "Cursor opened");
        Ok(())
    }

    /// Declare a cursor after substituting `?` placeholders in `sql`
    pub async fn open_cursor_with_params(
        &mut self,
        sql: &str,
        params: &[Value],
        name: &str,
        buffer_size: usize,
    ) -> Result<()> {
        let sql = params::substitute(sql, params)?;
        self.open_cursor(&sql, name, buffer_size).await
    }

    /// Refill the buffer of `name` if it is empty.
    ///
    /// Does nothing while rows remain buffered or once the cursor is
    /// exhausted. Returns the phase after the call.
    pub async fn fetch_buffer(&mut self, name: &str) -> Result<Phase> {
        let state = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownCursor(name.to_string()))?;
        if state.phase() != Phase::Empty {
            return Ok(state.phase());
        }
        let buffer_size = state.buffer_size();

        let result = self
            .conn
            .execute(&format!("FETCH {} FROM {}", buffer_size, name))
            .await
            .map_err(|e| Error::CursorFetch {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        let state = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::UnknownCursor(name.to_string()))?;
        let (columns, rows) = result.into_parts();
        let fetched = rows.len();
        state.load(columns, rows);

        tracing::trace!(
            cursor = name,
            requested = buffer_size,
            fetched = fetched,
            phase = %state.phase(),
            "Fetched cursor buffer"
        );
        Ok(state.phase())
    }

    /// Next row of `name`, or `None` once the cursor is exhausted.
    ///
    /// A row that fails to decode is still consumed.
    pub async fn fetch_cursor(&mut self, name: &str) -> Result<Option<Row>> {
        if self.fetch_buffer(name).await? == Phase::Eof {
            return Ok(None);
        }

        let state = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::UnknownCursor(name.to_string()))?;
        let raw = match state.take_next() {
            Some(raw) => raw,
            None => return Ok(None),
        };
        tracing::trace!(cursor = name, row = state.dispensed(), "Dispensed row");

        let columns = state.columns().unwrap_or(&[]);
        RowDecoder::new(columns, &self.coercions)
            .decode_row(raw)
            .map(Some)
    }

    /// Close `name` and forget it.
    ///
    /// The cursor is unregistered even when `CLOSE` fails.
    pub async fn close_cursor(&mut self, name: &str) -> Result<()> {
        let state = self
            .registry
            .remove(name)
            .ok_or_else(|| Error::UnknownCursor(name.to_string()))?;

        match self.conn.execute(&format!("CLOSE {}", name)).await {
            Ok(_) => {
                tracing::debug!(
                    cursor = name,
                    fetches = state.fetches(),
                    rows = state.dispensed(),
                    "Cursor closed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(cursor = name, error = %e, "CLOSE failed, cursor dropped");
                Err(Error::CursorClose {
                    name: name.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Phase of `name`, if registered
    pub fn phase(&self, name: &str) -> Option<Phase> {
        self.registry.get(name).map(CursorState::phase)
    }

    /// Check if `name` is registered
    pub fn is_open(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Registered cursors
    pub fn registry(&self) -> &CursorRegistry {
        &self.registry
    }

    /// Coercion table applied to fetched rows
    pub fn coercions(&self) -> &CoercionTable {
        &self.coercions
    }

    /// Coercion table, for registering extra types
    pub fn coercions_mut(&mut self) -> &mut CoercionTable {
        &mut self.coercions
    }

    /// Underlying connection
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Underlying connection, for transaction control or plain statements
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Give the connection back, dropping the registry
    pub fn into_connection(self) -> C {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Column, ResultSet};
    use crate::constants::oid;
    use crate::memory::MemoryConnection;

    fn engine_with(n: i64) -> CursorEngine<MemoryConnection> {
        let mut result = ResultSet::new(vec![Column::new("n", oid::INT8)]);
        for i in 0..n {
            result.push_row(vec![Value::Integer(i)]);
        }
        CursorEngine::new(MemoryConnection::new().with_query("SELECT n FROM t", result))
    }

    #[tokio::test]
    async fn test_open_validates_arguments() {
        let mut engine = engine_with(1);
        engine.connection_mut().begin().await.unwrap();

        let err = engine.open_cursor("SELECT n FROM t", "bad name", 10).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCursorName(_)));

        let err = engine.open_cursor("SELECT n FROM t", "csr", 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidBufferSize(0)));

        assert!(engine.registry().is_empty());
        assert!(engine.connection().statements().iter().all(|s| !s.starts_with("DECLARE")));
    }

    #[tokio::test]
    async fn test_fetch_buffer_is_noop_while_buffered() {
        let mut engine = engine_with(3);
        engine.connection_mut().begin().await.unwrap();
        engine.open_cursor("SELECT n FROM t", "csr", 2).await.unwrap();

        assert_eq!(engine.phase("csr"), Some(Phase::Empty));
        assert_eq!(engine.fetch_buffer("csr").await.unwrap(), Phase::Buffered);
        assert_eq!(engine.fetch_buffer("csr").await.unwrap(), Phase::Buffered);
        assert_eq!(engine.connection().count_statements("FETCH"), 1);
    }

    #[tokio::test]
    async fn test_fetch_cursor_drains_in_order() {
        let mut engine = engine_with(3);
        engine.connection_mut().begin().await.unwrap();
        engine.open_cursor("SELECT n FROM t", "csr", 2).await.unwrap();

        let mut seen = Vec::new();
        while let Some(row) = engine.fetch_cursor("csr").await.unwrap() {
            seen.push(row.get_i64("n").unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(engine.phase("csr"), Some(Phase::Eof));
        assert_eq!(engine.connection().fetch_sizes(), &[2, 1, 0]);
    }

    #[tokio::test]
    async fn test_close_unregisters() {
        let mut engine = engine_with(1);
        engine.connection_mut().begin().await.unwrap();
        engine.open_cursor("SELECT n FROM t", "csr", 10).await.unwrap();
        assert!(engine.is_open("csr"));

        engine.close_cursor("csr").await.unwrap();
        assert!(!engine.is_open("csr"));
        assert!(!engine.connection().has_server_cursor("csr"));

        let err = engine.close_cursor("csr").await.unwrap_err();
        assert!(matches!(err, Error::UnknownCursor(ref name) if name == "csr"));
    }

    #[tokio::test]
    async fn test_into_connection() {
        let mut engine = engine_with(0);
        engine.connection_mut().begin().await.unwrap();
        engine.open_cursor("SELECT n FROM t", "csr", 10).await.unwrap();

        let conn = engine.into_connection();
        assert!(conn.has_server_cursor("csr"));
        assert!(conn.in_transaction());
    }
}
