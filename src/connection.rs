//! Connection seam used by the cursor engine
//!
//! The engine never talks to a database directly. It hands finished statement
//! text (`DECLARE`, `FETCH`, `CLOSE`, `BEGIN`, ...) to a [`Connection`] and
//! reads the returned [`ResultSet`].

use std::future::Future;

use crate::constants::Oid;
use crate::error::Result;
use crate::row::Value;

/// Column metadata: the name declared by the query and its type OID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as declared by the query
    pub name: String,
    /// PostgreSQL type OID
    pub type_oid: Oid,
}

impl Column {
    /// Create column metadata
    pub fn new(name: impl Into<String>, type_oid: Oid) -> Self {
        Self {
            name: name.into(),
            type_oid,
        }
    }
}

/// The outcome of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column metadata (empty for statements returning no rows)
    pub columns: Vec<Column>,
    /// Raw row data, one cell per column
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create an empty result with the given columns
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create an empty result (for statements returning nothing)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a row, builder style
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the column at `index`
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    /// Type OID of the column at `index`
    pub fn column_type(&self, index: usize) -> Option<Oid> {
        self.columns.get(index).map(|c| c.type_oid)
    }

    /// Cell at `row`, `column`
    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Split into column metadata and rows
    pub fn into_parts(self) -> (Vec<Column>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

/// A database connection able to run plain SQL statements.
///
/// Implementations must run statements in order on a single session, since
/// server-side cursors live inside the session's current transaction.
pub trait Connection: Send {
    /// Execute a statement without parameters and return its rows
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<ResultSet>> + Send;

    /// Start a transaction
    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move { self.execute("BEGIN").await.map(|_| ()) }
    }

    /// Commit the current transaction
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move { self.execute("COMMIT").await.map(|_| ()) }
    }

    /// Roll back the current transaction
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move { self.execute("ROLLBACK").await.map(|_| ()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::oid;

    #[test]
    fn test_result_set_introspection() {
        let result = ResultSet::new(vec![Column::new("id", oid::INT4), Column::new("name", oid::TEXT)])
            .with_row(vec![Value::Integer(1), Value::from("alice")])
            .with_row(vec![Value::Integer(2), Value::Null]);

        assert_eq!(result.column_count(), 2);
        assert_eq!(result.row_count(), 2);
        assert!(!result.is_empty());
        assert_eq!(result.column_name(1), Some("name"));
        assert_eq!(result.column_type(0), Some(oid::INT4));
        assert_eq!(result.column_type(5), None);
        assert_eq!(result.value(0, 1), Some(&Value::from("alice")));
        assert_eq!(result.value(1, 1), Some(&Value::Null));
        assert_eq!(result.value(2, 0), None);
    }

    #[test]
    fn test_empty_result() {
        let result = ResultSet::empty();
        assert!(result.is_empty());
        assert_eq!(result.column_count(), 0);
    }
}
