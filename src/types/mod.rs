//! PostgreSQL data type decoding
//!
//! This module provides functions for turning the server's text (and, for
//! NUMERIC, binary) representations into Rust values.

mod binary;
mod numeric;
mod timestamp;

pub use binary::{escape_bytea, unescape_bytea};
pub use numeric::Numeric;
pub use timestamp::{
    format_timestamp, format_timestamptz, is_infinity, parse_date, parse_timestamp,
    parse_timestamptz,
};
