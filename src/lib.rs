#![warn(missing_docs)]

//! # pgcursor
//!
//! Buffered iteration over PostgreSQL server-side cursors.
//!
//! Large result sets are read through a named cursor (`DECLARE` / `FETCH n` /
//! `CLOSE`) so that at most one buffer of rows is held in memory at a time.
//! Rows are handed out one by one as ordered column-name maps, with `bytea`,
//! timestamps and `numeric` decoded into native values.
//!
//! ## Features
//!
//! - **Bounded memory** - one `FETCH` of `buffer_size` rows at a time
//! - **Async/await** - any [`Connection`] can drive the engine
//! - **Scoped transactions** - [`CursorEngine::iterate`] commits on success and
//!   rolls back on failure
//! - **Typed values** - an extensible [`CoercionTable`] keyed by type OID
//! - **tokio-postgres** - `Connection` for `tokio_postgres::Client` behind the
//!   `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pgcursor::{CursorEngine, CursorOptions};
//!
//! # #[cfg(feature = "postgres")]
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (client, connection) =
//!         tokio_postgres::connect("host=localhost user=postgres", tokio_postgres::NoTls).await?;
//!     tokio::spawn(connection);
//!
//!     let mut engine = CursorEngine::new(client);
//!     let options = CursorOptions::new().with_name("events").with_buffer_size(1_000);
//!
//!     let count = engine
//!         .iterate("SELECT id, payload, created_at FROM events", &options, |row| {
//!             println!("{} at {}", row["id"], row["created_at"]);
//!             Ok(())
//!         })
//!         .await?;
//!
//!     println!("{} events", count);
//!     Ok(())
//! }
//! # #[cfg(not(feature = "postgres"))]
//! # fn main() {}
//! ```
//!
//! ## Manual Cursor Control
//!
//! The engine does not manage transactions on its own; open cursors inside
//! one:
//!
//! ```rust
//! use pgcursor::{Column, Connection, CursorEngine, MemoryConnection, Phase, ResultSet, Value, oid};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut blobs = ResultSet::new(vec![Column::new("data", oid::BYTEA)]);
//! blobs.push_row(vec![Value::from("\\x0102")]);
//!
//! let conn = MemoryConnection::new().with_query("SELECT data FROM blobs", blobs);
//! let mut engine = CursorEngine::new(conn);
//!
//! engine.connection_mut().begin().await?;
//! engine.open_cursor("SELECT data FROM blobs", "blobs", 100).await?;
//!
//! let row = engine.fetch_cursor("blobs").await?.unwrap();
//! assert_eq!(row["data"].as_bytes(), Some(&[1u8, 2][..]));
//!
//! assert!(engine.fetch_cursor("blobs").await?.is_none());
//! assert_eq!(engine.phase("blobs"), Some(Phase::Eof));
//!
//! engine.close_cursor("blobs").await?;
//! engine.connection_mut().commit().await?;
//! # Ok::<(), pgcursor::Error>(())
//! # }).unwrap();
//! ```

pub mod coerce;
pub mod config;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod engine;
pub mod error;
mod iterate;
pub mod memory;
pub mod params;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod registry;
pub mod row;
pub mod types;

// Re-export commonly used types
pub use coerce::{Coercer, CoercionTable};
pub use config::CursorOptions;
pub use connection::{Column, Connection, ResultSet};
pub use constants::{oid, Oid};
pub use cursor::{CursorState, Phase};
pub use engine::CursorEngine;
pub use error::{Error, Result};
pub use memory::MemoryConnection;
pub use registry::CursorRegistry;
pub use row::{Row, RowDecoder, Value};
pub use types::Numeric;
