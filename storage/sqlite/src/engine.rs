//! Batched operations against the state table.

use std::collections::HashSet;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use statex_core::chunk::key_chunks;
use statex_core::merge::merge_values;
use statex_core::pair::validate_pairs;
use statex_core::{ChangeKind, ChangeNotifier, RawPair, StateChange, StateHandle, StoreError};
use tracing::{debug, error, warn};

use crate::config::StoreConfig;
use crate::error::SqliteError;
use crate::sql_builder;
use crate::supplier::DatabaseSupplier;

/// Synchronous operation engine. Lives on the store's worker thread, which gives every call
/// exclusive access to the database handle.
pub struct SqliteEngine {
    supplier: DatabaseSupplier,
    state: StateHandle,
    notifier: ChangeNotifier,
}

impl SqliteEngine {
    pub fn new(config: StoreConfig, state: StateHandle, notifier: ChangeNotifier) -> Self {
        Self { supplier: DatabaseSupplier::new(config), state, notifier }
    }

    pub fn supplier(&self) -> &DatabaseSupplier { &self.supplier }

    /// Gate every operation: refuse while shutting down, otherwise open the database.
    fn ensure_database(&mut self) -> Result<&mut Connection, StoreError> {
        if self.state.is_shutting_down() {
            return Err(StoreError::DatabaseUnavailable);
        }
        self.open_database()
    }

    /// # Panics
    ///
    /// When the database cannot be opened even after destructive recovery.
    fn open_database(&mut self) -> Result<&mut Connection, StoreError> {
        let destructive = self.supplier.config().recovers_destructively();
        match self.supplier.handle() {
            Ok(conn) => Ok(conn),
            Err(err) if !destructive => {
                warn!("{}", err);
                Err(StoreError::DatabaseUnavailable)
            }
            Err(err) => {
                error!("{}", err);
                panic!("{}", err)
            }
        }
    }

    pub fn get_many(&mut self, keys: Vec<String>) -> Result<Vec<(String, Option<String>)>, StoreError> {
        let conn = self.ensure_database()?;
        read_values(conn, &keys).map_err(operation_failed)
    }

    pub fn set_many(&mut self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
        let conn = self.ensure_database()?;
        let pairs = validate_pairs(pairs)?;
        with_transaction(conn, |tx| {
            let mut stmt = tx.prepare_cached(&sql_builder::upsert())?;
            for (key, value) in &pairs {
                stmt.execute(params![key, value])?;
            }
            Ok(())
        })
        .map_err(operation_failed)?;
        self.notify(ChangeKind::Set, pairs.into_iter().map(|(key, _)| key).collect());
        Ok(())
    }

    pub fn remove_many(&mut self, keys: Vec<String>) -> Result<(), StoreError> {
        let conn = self.ensure_database()?;
        with_transaction(conn, |tx| {
            for chunk in key_chunks(&keys) {
                let removed = tx.execute(&sql_builder::delete_keys(chunk.len()), params_from_iter(chunk.iter()))?;
                debug!("Removed {} of {} keys", removed, chunk.len());
            }
            Ok(())
        })
        .map_err(operation_failed)?;
        self.notify(ChangeKind::Removed, keys);
        Ok(())
    }

    pub fn merge_many(&mut self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
        let conn = self.ensure_database()?;
        let pairs = validate_pairs(pairs)?;
        with_transaction(conn, |tx| {
            let mut select = tx.prepare_cached(&sql_builder::select_value())?;
            let mut upsert = tx.prepare_cached(&sql_builder::upsert())?;
            for (key, value) in &pairs {
                let existing: Option<String> = select.query_row([key], |row| row.get(0)).optional()?;
                match existing {
                    Some(existing) => upsert.execute(params![key, merge_values(&existing, value)])?,
                    None => upsert.execute(params![key, value])?,
                };
            }
            Ok(())
        })
        .map_err(operation_failed)?;
        self.notify(ChangeKind::Merged, pairs.into_iter().map(|(key, _)| key).collect());
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.ensure_database()?;
        self.delete_all_rows()
    }

    /// Delete every row, opening the database if needed. Not gated on the module state.
    pub fn wipe(&mut self) -> Result<(), StoreError> { self.delete_all_rows() }

    fn delete_all_rows(&mut self) -> Result<(), StoreError> {
        let conn = self.open_database()?;
        conn.execute(&sql_builder::delete_all(), []).map_err(|e| operation_failed(SqliteError::from(e)))?;
        self.notifier.notify(StateChange::cleared());
        Ok(())
    }

    pub fn all_keys(&mut self) -> Result<Vec<String>, StoreError> {
        let conn = self.ensure_database()?;
        read_keys(conn).map_err(operation_failed)
    }

    /// Delete the database file. Not gated on the module state.
    pub fn delete_database(&mut self) -> bool {
        let deleted = self.supplier.destroy();
        if deleted {
            self.notifier.notify(StateChange::cleared());
        }
        deleted
    }

    fn notify(&self, kind: ChangeKind, keys: Vec<String>) { self.notifier.notify(StateChange::new(kind, keys)); }
}

fn operation_failed(err: SqliteError) -> StoreError {
    warn!("{}", err);
    err.into()
}

/// Run `f` in a transaction. The first error wins: a failure in `f` is reported even if the
/// rollback also fails, and a commit failure is reported only when `f` succeeded.
fn with_transaction<T>(conn: &mut Connection, f: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteError>) -> Result<T, SqliteError> {
    let tx = conn.transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

fn read_values(conn: &Connection, keys: &[String]) -> Result<Vec<(String, Option<String>)>, SqliteError> {
    let mut data = Vec::with_capacity(keys.len());
    for chunk in key_chunks(keys) {
        let mut remaining: HashSet<&str> = chunk.iter().map(String::as_str).collect();
        let mut stmt = conn.prepare_cached(&sql_builder::select_values(chunk.len()))?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            remaining.remove(key.as_str());
            data.push((key, Some(value)));
        }
        // unmatched keys follow the rows, once each
        for key in chunk {
            if remaining.remove(key.as_str()) {
                data.push((key.clone(), None));
            }
        }
    }
    Ok(data)
}

fn read_keys(conn: &Connection) -> Result<Vec<String>, SqliteError> {
    let mut stmt = conn.prepare(&sql_builder::select_keys())?;
    let keys = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statex_core::pair;
    use std::time::Duration;

    fn engine(dir: &tempfile::TempDir) -> SqliteEngine {
        let config = StoreConfig::new(dir.path()).retry_delay(Duration::from_millis(1));
        SqliteEngine::new(config, StateHandle::new(), ChangeNotifier::new())
    }

    #[test]
    fn opens_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);
        assert!(!engine.supplier().is_open());
        assert_eq!(engine.all_keys(), Ok(vec![]));
        assert!(engine.supplier().is_open());
    }

    #[test]
    fn unmatched_keys_follow_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);
        engine.set_many(vec![pair("b", "2")]).unwrap();

        let result = engine.get_many(vec!["a".into(), "b".into(), "c".into(), "a".into()]).unwrap();
        assert_eq!(
            result,
            vec![("b".to_string(), Some("2".to_string())), ("a".to_string(), None), ("c".to_string(), None)]
        );
    }

    #[test]
    fn last_write_wins_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);
        engine.set_many(vec![pair("k", "first"), pair("k", "second")]).unwrap();
        assert_eq!(engine.get_many(vec!["k".into()]).unwrap(), vec![("k".to_string(), Some("second".to_string()))]);
    }

    #[test]
    fn merges_see_earlier_pairs_in_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);
        engine.merge_many(vec![pair("k", r#"{"a":1}"#), pair("k", r#"{"b":2}"#)]).unwrap();
        let value = engine.get_many(vec!["k".into()]).unwrap().remove(0).1.unwrap();
        let value: serde_json::Value = serde_json::from_str(&value).unwrap();
        assert_eq!(value, serde_json::json!({"a":1,"b":2}));
    }

    #[test]
    fn failed_statement_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(&dir);
        engine.set_many(vec![pair("kept", "1")]).unwrap();

        let conn = engine.supplier.handle().unwrap();
        let result = with_transaction(conn, |tx| {
            tx.execute(&sql_builder::delete_all(), [])?;
            tx.execute("INSERT INTO missing_table VALUES (1)", [])?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(engine.all_keys(), Ok(vec!["kept".to_string()]));
    }

    #[test]
    fn delete_database_ignores_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateHandle::new();
        let config = StoreConfig::new(dir.path());
        let mut engine = SqliteEngine::new(config, state.clone(), ChangeNotifier::new());
        engine.set_many(vec![pair("a", "1")]).unwrap();

        state.shut_down();
        assert_eq!(engine.clear(), Err(StoreError::DatabaseUnavailable));
        assert!(engine.delete_database());
        assert!(!engine.supplier().config().path().exists());
    }

    #[test]
    fn wipe_ignores_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateHandle::new();
        let config = StoreConfig::new(dir.path());
        let mut engine = SqliteEngine::new(config, state.clone(), ChangeNotifier::new());
        engine.set_many(vec![pair("a", "1")]).unwrap();

        state.shut_down();
        assert_eq!(engine.wipe(), Ok(()));
        assert_eq!(engine.all_keys(), Err(StoreError::DatabaseUnavailable));
        state.activate();
        assert_eq!(engine.all_keys(), Ok(vec![]));
    }
}
