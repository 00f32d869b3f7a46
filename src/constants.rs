//! PostgreSQL protocol constants
//!
//! Type OIDs, SQLSTATE codes and cursor defaults used throughout the crate.
//! OID values come from the `pg_type` system catalog.

/// PostgreSQL type object identifier
pub type Oid = u32;

// =============================================================================
// Cursor Defaults
// =============================================================================

/// Cursor name used when none is given
pub const DEFAULT_CURSOR_NAME: &str = "csr";

/// Rows requested by each `FETCH` when no buffer size is given
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Longest identifier PostgreSQL keeps without truncation (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

// =============================================================================
// Type OIDs
// =============================================================================

/// Built-in type OIDs
#[allow(missing_docs)]
pub mod oid {
    use super::Oid;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const JSON: Oid = 114;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const UNKNOWN: Oid = 705;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const NUMERIC: Oid = 1700;
}

// =============================================================================
// SQLSTATE Codes
// =============================================================================

/// SQLSTATE codes reported for cursor failures
#[allow(missing_docs)]
pub mod sqlstate {
    pub const SYNTAX_ERROR: &str = "42601";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const DUPLICATE_CURSOR: &str = "42P03";
    pub const INVALID_CURSOR_NAME: &str = "34000";
    pub const NO_ACTIVE_SQL_TRANSACTION: &str = "25P01";
    pub const ACTIVE_SQL_TRANSACTION: &str = "25001";
    pub const INTERNAL_ERROR: &str = "XX000";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_fits_identifier_limit() {
        assert!(DEFAULT_CURSOR_NAME.len() <= MAX_IDENTIFIER_LENGTH);
        assert!(DEFAULT_BUFFER_SIZE > 0);
    }

    #[test]
    fn test_sqlstate_codes_are_five_characters() {
        for code in [
            sqlstate::SYNTAX_ERROR,
            sqlstate::UNDEFINED_TABLE,
            sqlstate::DUPLICATE_CURSOR,
            sqlstate::INVALID_CURSOR_NAME,
            sqlstate::NO_ACTIVE_SQL_TRANSACTION,
            sqlstate::ACTIVE_SQL_TRANSACTION,
            sqlstate::INTERNAL_ERROR,
        ] {
            assert_eq!(code.len(), 5, "{code}");
        }
    }
}
