//! Whole-result iteration
//!
//! [`CursorEngine::iterate`] runs the full cursor lifecycle for one query:
//! optional `BEGIN`, `DECLARE`, fetch every row, `CLOSE`, `COMMIT`. When any
//! step fails (including the row callback) the cursor is closed and the
//! transaction rolled back before the error is returned.

use crate::config::CursorOptions;
use crate::connection::Connection;
use crate::engine::CursorEngine;
use crate::error::Result;
use crate::params;
use crate::row::{Row, Value};

impl<C: Connection> CursorEngine<C> {
    /// Stream every row of `sql` through `on_row`, returning the row count.
    ///
    /// Errors returned by `on_row` abort the iteration; wrap foreign errors
    /// with [`Error::callback`](crate::Error::callback).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pgcursor::{Column, CursorEngine, CursorOptions, MemoryConnection, ResultSet, Value, oid};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let mut ids = ResultSet::new(vec![Column::new("id", oid::INT4)]);
    /// for id in 1..=5 {
    ///     ids.push_row(vec![Value::Integer(id)]);
    /// }
    ///
    /// let conn = MemoryConnection::new().with_query("SELECT id FROM items", ids);
    /// let mut engine = CursorEngine::new(conn);
    ///
    /// let mut total = 0;
    /// let count = engine
    ///     .iterate("SELECT id FROM items", &CursorOptions::new().with_buffer_size(2), |row| {
    ///         total += row.get_i64("id").unwrap_or(0);
    ///         Ok(())
    ///     })
    ///     .await?;
    ///
    /// assert_eq!(count, 5);
    /// assert_eq!(total, 15);
    /// # Ok::<(), pgcursor::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn iterate<F>(&mut self, sql: &str, options: &CursorOptions, on_row: F) -> Result<u64>
    where
        F: FnMut(Row) -> Result<()>,
    {
        options.validate()?;

        if options.use_transaction {
            self.connection_mut().begin().await?;
        }

        match self.drain(sql, options, on_row).await {
            Ok(count) => {
                if options.use_transaction {
                    self.connection_mut().commit().await?;
                }
                tracing::debug!(cursor = %options.name, rows = count, "Iteration complete");
                Ok(count)
            }
            Err(e) => {
                self.abort(&options.name, options.use_transaction).await;
                Err(e)
            }
        }
    }

    /// Like [`iterate`](Self::iterate), substituting `?` placeholders first
    pub async fn iterate_with_params<F>(
        &mut self,
        sql: &str,
        params: &[Value],
        options: &CursorOptions,
        on_row: F,
    ) -> Result<u64>
    where
        F: FnMut(Row) -> Result<()>,
    {
        let sql = params::substitute(sql, params)?;
        self.iterate(&sql, options, on_row).await
    }

    async fn drain<F>(&mut self, sql: &str, options: &CursorOptions, mut on_row: F) -> Result<u64>
    where
        F: FnMut(Row) -> Result<()>,
    {
        let name = options.name.as_str();
        self.open_cursor(sql, name, options.buffer_size).await?;

        let mut count = 0u64;
        while let Some(row) = self.fetch_cursor(name).await? {
            count += 1;
            on_row(row)?;
        }

        self.close_cursor(name).await?;
        Ok(count)
    }

    /// Best-effort cleanup after a failed iteration
    async fn abort(&mut self, name: &str, rollback: bool) {
        if self.is_open(name) {
            if let Err(e) = self.close_cursor(name).await {
                tracing::warn!(cursor = name, error = %e, "Failed to close cursor after error");
            }
        }
        if rollback {
            if let Err(e) = self.connection_mut().rollback().await {
                tracing::warn!(cursor = name, error = %e, "Failed to roll back after error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::{Column, Connection, ResultSet};
    use crate::constants::oid;
    use crate::error::Error;
    use crate::memory::MemoryConnection;
    use crate::{CursorEngine, CursorOptions, Value};

    fn engine_with(n: i64) -> CursorEngine<MemoryConnection> {
        let mut result = ResultSet::new(vec![Column::new("n", oid::INT8)]);
        for i in 0..n {
            result.push_row(vec![Value::Integer(i)]);
        }
        CursorEngine::new(MemoryConnection::new().with_query("SELECT n FROM t", result))
    }

    #[tokio::test]
    async fn test_iterate_statement_sequence() {
        let mut engine = engine_with(3);
        let options = CursorOptions::new().with_name("c").with_buffer_size(2);
        let count = engine.iterate("SELECT n FROM t", &options, |_| Ok(())).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            engine.connection().statements(),
            &[
                "BEGIN",
                "DECLARE c CURSOR FOR SELECT n FROM t",
                "FETCH 2 FROM c",
                "FETCH 2 FROM c",
                "FETCH 2 FROM c",
                "CLOSE c",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn test_iterate_without_transaction() {
        let mut engine = engine_with(2);
        engine.connection_mut().begin().await.unwrap();

        let options = CursorOptions::new().with_transaction(false);
        let count = engine.iterate("SELECT n FROM t", &options, |_| Ok(())).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(engine.connection().count_statements("BEGIN"), 1);
        assert_eq!(engine.connection().count_statements("COMMIT"), 0);
        assert!(engine.connection().in_transaction());
    }

    #[tokio::test]
    async fn test_iterate_rejects_invalid_options() {
        let mut engine = engine_with(1);
        let options = CursorOptions::new().with_buffer_size(0);
        let err = engine.iterate("SELECT n FROM t", &options, |_| Ok(())).await.unwrap_err();

        assert!(matches!(err, Error::InvalidBufferSize(0)));
        assert!(engine.connection().statements().is_empty());
    }

    #[tokio::test]
    async fn test_iterate_with_params() {
        let mut engine = engine_with(4);
        engine
            .connection_mut()
            .add_query("SELECT n FROM t WHERE n > 1", ResultSet::new(vec![Column::new("n", oid::INT8)]));

        let count = engine
            .iterate_with_params("SELECT n FROM t WHERE n > ?", &[Value::Integer(1)], &CursorOptions::new(), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(engine
            .connection()
            .statements()
            .iter()
            .any(|s| s == "DECLARE csr CURSOR FOR SELECT n FROM t WHERE n > 1"));
    }
}
