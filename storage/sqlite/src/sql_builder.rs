//! SQL text for the state table.

use crate::config::{KEY_COLUMN, TABLE_STATE, VALUE_COLUMN};

pub fn create_table() -> String {
    format!(r#"CREATE TABLE IF NOT EXISTS "{TABLE_STATE}" ("{KEY_COLUMN}" TEXT PRIMARY KEY, "{VALUE_COLUMN}" TEXT NOT NULL)"#)
}

pub fn drop_table() -> String { format!(r#"DROP TABLE IF EXISTS "{TABLE_STATE}""#) }

/// `key IN (?, ?, ...)` with `count` placeholders
pub fn key_selection(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!(r#""{KEY_COLUMN}" IN ({placeholders})"#)
}

pub fn select_values(count: usize) -> String {
    format!(r#"SELECT "{KEY_COLUMN}", "{VALUE_COLUMN}" FROM "{TABLE_STATE}" WHERE {}"#, key_selection(count))
}

pub fn select_value() -> String { format!(r#"SELECT "{VALUE_COLUMN}" FROM "{TABLE_STATE}" WHERE "{KEY_COLUMN}" = ?"#) }

pub fn select_keys() -> String { format!(r#"SELECT "{KEY_COLUMN}" FROM "{TABLE_STATE}""#) }

pub fn upsert() -> String { format!(r#"INSERT OR REPLACE INTO "{TABLE_STATE}" ("{KEY_COLUMN}", "{VALUE_COLUMN}") VALUES (?, ?)"#) }

pub fn delete_keys(count: usize) -> String { format!(r#"DELETE FROM "{TABLE_STATE}" WHERE {}"#, key_selection(count)) }

pub fn delete_all() -> String { format!(r#"DELETE FROM "{TABLE_STATE}""#) }
