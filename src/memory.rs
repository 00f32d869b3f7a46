//! In-memory connection
//!
//! [`MemoryConnection`] answers a fixed set of queries from memory and
//! emulates the server side of cursor handling closely enough to exercise the
//! engine without a database:
//!
//! - `BEGIN` / `COMMIT` / `ROLLBACK` track a single transaction; ending it
//!   drops every cursor declared inside it
//! - `DECLARE` outside a transaction, or for an existing name, fails
//! - `FETCH n FROM c` returns up to `n` rows; `CLOSE c` deallocates
//! - any other statement must match a registered query and returns its rows
//!
//! Every statement is logged, and statements can be made to fail on demand,
//! either before they run or after the server has applied them.

use std::collections::{HashMap, VecDeque};

use crate::connection::{Column, Connection, ResultSet};
use crate::constants::sqlstate;
use crate::error::{Error, Result};
use crate::row::Value;

#[derive(Debug)]
struct ServerCursor {
    columns: Vec<Column>,
    rows: VecDeque<Vec<Value>>,
}

/// A [`Connection`] backed by canned query results
#[derive(Debug, Default)]
pub struct MemoryConnection {
    queries: HashMap<String, ResultSet>,
    cursors: HashMap<String, ServerCursor>,
    in_transaction: bool,
    failures: Vec<String>,
    failures_after: Vec<String>,
    statements: Vec<String>,
    fetch_sizes: Vec<usize>,
}

impl MemoryConnection {
    /// Create a connection with no known queries
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the result of a query, builder style
    pub fn with_query(mut self, sql: &str, result: ResultSet) -> Self {
        self.add_query(sql, result);
        self
    }

    /// Register the result of a query
    pub fn add_query(&mut self, sql: &str, result: ResultSet) {
        self.queries.insert(normalize(sql), result);
    }

    /// Make every statement starting with `prefix` fail, builder style
    pub fn with_failure(mut self, prefix: &str) -> Self {
        self.fail_on(prefix);
        self
    }

    /// Make every statement starting with `prefix` (case-insensitive) fail
    pub fn fail_on(&mut self, prefix: &str) {
        self.failures.push(prefix.trim().to_ascii_uppercase());
    }

    /// Make every statement starting with `prefix` (case-insensitive) take
    /// effect and then report a failure, as when the reply is lost
    pub fn fail_after(&mut self, prefix: &str) {
        self.failures_after.push(prefix.trim().to_ascii_uppercase());
    }

    /// Stop injecting failures
    pub fn clear_failures(&mut self) {
        self.failures.clear();
        self.failures_after.clear();
    }

    /// Every statement received, in order
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Number of statements received that start with `prefix` (case-insensitive)
    pub fn count_statements(&self, prefix: &str) -> usize {
        let prefix = prefix.to_ascii_uppercase();
        self.statements
            .iter()
            .filter(|s| s.trim_start().to_ascii_uppercase().starts_with(&prefix))
            .count()
    }

    /// Rows returned by each `FETCH`, in order
    pub fn fetch_sizes(&self) -> &[usize] {
        &self.fetch_sizes
    }

    /// Check if a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Check if the server holds a cursor with this name
    pub fn has_server_cursor(&self, name: &str) -> bool {
        self.cursors.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of cursors held server side
    pub fn server_cursor_count(&self) -> usize {
        self.cursors.len()
    }

    fn run(&mut self, sql: &str) -> Result<ResultSet> {
        let statement = normalize(sql);
        let upper = statement.to_ascii_uppercase();

        let injected = || {
            Error::statement(
                Some(sqlstate::INTERNAL_ERROR),
                format!("injected failure for statement: {}", statement),
            )
        };
        let matches = |prefixes: &[String]| prefixes.iter().any(|p| upper.starts_with(p.as_str()));

        if matches(&self.failures) {
            return Err(injected());
        }

        let keyword = upper.split_whitespace().next().unwrap_or("");
        let result = match keyword {
            "BEGIN" | "START" => self.begin_transaction(),
            "COMMIT" | "END" | "ROLLBACK" | "ABORT" => self.end_transaction(),
            "DECLARE" => self.declare(&statement, &upper),
            "FETCH" => self.fetch(&statement),
            "CLOSE" => self.close(&statement),
            _ => self.query(&statement),
        };

        match result {
            Ok(_) if matches(&self.failures_after) => Err(injected()),
            other => other,
        }
    }

    fn begin_transaction(&mut self) -> Result<ResultSet> {
        if self.in_transaction {
            return Err(Error::statement(
                Some(sqlstate::ACTIVE_SQL_TRANSACTION),
                "there is already a transaction in progress",
            ));
        }
        self.in_transaction = true;
        Ok(ResultSet::empty())
    }

    fn end_transaction(&mut self) -> Result<ResultSet> {
        self.in_transaction = false;
        self.cursors.clear();
        Ok(ResultSet::empty())
    }

    fn declare(&mut self, statement: &str, upper: &str) -> Result<ResultSet> {
        let syntax_error = || {
            Error::statement(
                Some(sqlstate::SYNTAX_ERROR),
                format!("syntax error in {:?}", statement),
            )
        };

        // `upper` has the same byte offsets as `statement`
        let marker = " CURSOR FOR ";
        let at = upper.find(marker).ok_or_else(syntax_error)?;
        let name = statement["DECLARE".len()..at]
            .split_whitespace()
            .next()
            .ok_or_else(syntax_error)?
            .to_ascii_lowercase();
        let query = statement[at + marker.len()..].trim();

        if !self.in_transaction {
            return Err(Error::statement(
                Some(sqlstate::NO_ACTIVE_SQL_TRANSACTION),
                "DECLARE CURSOR can only be used in transaction blocks",
            ));
        }
        if self.cursors.contains_key(&name) {
            return Err(Error::statement(
                Some(sqlstate::DUPLICATE_CURSOR),
                format!("cursor \"{}\" already exists", name),
            ));
        }

        let (columns, rows) = self.lookup(query)?.clone().into_parts();
        self.cursors.insert(
            name,
            ServerCursor {
                columns,
                rows: rows.into(),
            },
        );
        Ok(ResultSet::empty())
    }

    fn fetch(&mut self, statement: &str) -> Result<ResultSet> {
        // FETCH <count> FROM <name>
        let parts: Vec<&str> = statement.split_whitespace().collect();
        let (count, name) = match parts.as_slice() {
            [_, count, from, name] if from.eq_ignore_ascii_case("FROM") => {
                let count: usize = count.parse().map_err(|_| {
                    Error::statement(
                        Some(sqlstate::SYNTAX_ERROR),
                        format!("invalid fetch count {:?}", count),
                    )
                })?;
                (count, name.to_ascii_lowercase())
            }
            _ => {
                return Err(Error::statement(
                    Some(sqlstate::SYNTAX_ERROR),
                    format!("syntax error in {:?}", statement),
                ));
            }
        };

        let cursor = self.cursors.get_mut(&name).ok_or_else(|| missing_cursor(&name))?;
        let take = count.min(cursor.rows.len());
        let mut result = ResultSet::new(cursor.columns.clone());
        result.rows.extend(cursor.rows.drain(..take));

        self.fetch_sizes.push(result.row_count());
        Ok(result)
    }

    fn close(&mut self, statement: &str) -> Result<ResultSet> {
        let name = statement
            .split_whitespace()
            .nth(1)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.cursors
            .remove(&name)
            .map(|_| ResultSet::empty())
            .ok_or_else(|| missing_cursor(&name))
    }

    fn query(&self, statement: &str) -> Result<ResultSet> {
        self.lookup(statement).cloned()
    }

    fn lookup(&self, query: &str) -> Result<&ResultSet> {
        self.queries.get(&normalize(query)).ok_or_else(|| {
            Error::statement(
                Some(sqlstate::UNDEFINED_TABLE),
                format!("unknown query: {}", query),
            )
        })
    }
}

impl Connection for MemoryConnection {
    async fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        self.statements.push(sql.to_string());
        self.run(sql)
    }
}

fn missing_cursor(name: &str) -> Error {
    Error::statement(
        Some(sqlstate::INVALID_CURSOR_NAME),
        format!("cursor \"{}\" does not exist", name),
    )
}

/// Collapse whitespace runs and drop a trailing semicolon
fn normalize(sql: &str) -> String {
    let trimmed = sql.trim().trim_end_matches(';');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::oid;

    fn numbers(n: i64) -> ResultSet {
        let mut result = ResultSet::new(vec![Column::new("n", oid::INT8)]);
        for i in 0..n {
            result.push_row(vec![Value::Integer(i)]);
        }
        result
    }

    fn run(conn: &mut MemoryConnection, sql: &str) -> Result<ResultSet> {
        conn.statements.push(sql.to_string());
        conn.run(sql)
    }

    #[test]
    fn test_plain_query() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(3));
        let result = run(&mut conn, "  SELECT n\n FROM t; ").unwrap();
        assert_eq!(result.row_count(), 3);
        assert!(run(&mut conn, "SELECT * FROM missing").is_err());
    }

    #[test]
    fn test_declare_requires_transaction() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(3));
        let err = run(&mut conn, "DECLARE c CURSOR FOR SELECT n FROM t").unwrap_err();
        assert!(err.to_string().contains("transaction blocks"));
        assert_eq!(conn.server_cursor_count(), 0);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(5));
        run(&mut conn, "BEGIN").unwrap();
        run(&mut conn, "DECLARE Csr CURSOR FOR SELECT n FROM t").unwrap();
        assert!(conn.has_server_cursor("csr"));

        assert_eq!(run(&mut conn, "FETCH 2 FROM csr").unwrap().row_count(), 2);
        let last = run(&mut conn, "FETCH 10 FROM CSR").unwrap();
        assert_eq!(last.value(0, 0), Some(&Value::Integer(2)));
        assert_eq!(last.row_count(), 3);
        assert_eq!(run(&mut conn, "FETCH 10 FROM csr").unwrap().row_count(), 0);
        assert_eq!(conn.fetch_sizes(), &[2, 3, 0]);

        run(&mut conn, "CLOSE csr").unwrap();
        assert!(run(&mut conn, "CLOSE csr").is_err());
        assert!(run(&mut conn, "FETCH 1 FROM csr").is_err());
    }

    #[test]
    fn test_duplicate_declare_fails() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(1));
        run(&mut conn, "BEGIN").unwrap();
        run(&mut conn, "DECLARE c CURSOR FOR SELECT n FROM t").unwrap();
        let err = run(&mut conn, "DECLARE c CURSOR FOR SELECT n FROM t").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_commit_drops_cursors() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(1));
        run(&mut conn, "BEGIN").unwrap();
        run(&mut conn, "DECLARE c CURSOR FOR SELECT n FROM t").unwrap();
        run(&mut conn, "COMMIT").unwrap();
        assert!(!conn.in_transaction());
        assert_eq!(conn.server_cursor_count(), 0);
    }

    #[test]
    fn test_injected_failures() {
        let mut conn = MemoryConnection::new().with_failure("close");
        run(&mut conn, "BEGIN").unwrap();
        assert!(run(&mut conn, "CLOSE anything").unwrap_err().to_string().contains("injected"));
        conn.clear_failures();
        assert!(run(&mut conn, "CLOSE anything").unwrap_err().to_string().contains("does not exist"));
        assert_eq!(conn.count_statements("close"), 2);
    }

    #[test]
    fn test_failure_after_statement_applies() {
        let mut conn = MemoryConnection::new().with_query("SELECT n FROM t", numbers(1));
        run(&mut conn, "BEGIN").unwrap();
        run(&mut conn, "DECLARE c CURSOR FOR SELECT n FROM t").unwrap();
        conn.fail_after("CLOSE");

        assert!(run(&mut conn, "CLOSE c").unwrap_err().to_string().contains("injected"));
        assert!(!conn.has_server_cursor("c"));
    }
}
