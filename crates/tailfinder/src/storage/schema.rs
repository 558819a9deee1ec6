//! `SQLite` schema definitions for tailfinder.
//!
//! The preference store is a flat key-value table; values are JSON text.

/// SQL statement to create the preferences table.
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_PREFERENCES_TABLE, CREATE_METADATA_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_preferences_table_is_key_value() {
        assert!(CREATE_PREFERENCES_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_PREFERENCES_TABLE.contains("value TEXT NOT NULL"));
    }

    #[test]
    fn test_statements_are_idempotent() {
        for stmt in SCHEMA_STATEMENTS {
            assert!(stmt.contains("IF NOT EXISTS"));
        }
    }
}
