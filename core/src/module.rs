//! The host-facing module: request entry points plus the lifecycle hooks the host environment calls.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::changes::StateChange;
use crate::error::StoreError;
use crate::pair::RawPair;
use crate::state::{ModuleState, StateHandle};
use crate::storage::KeyValueStorage;

/// How a sensitive-data wipe was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeOutcome {
    /// Every row was deleted
    Cleared,
    /// Clearing failed, the database file was deleted instead
    Deleted,
}

pub struct StateModule<S: KeyValueStorage> {
    storage: Arc<S>,
    state: StateHandle,
}

impl<S: KeyValueStorage> Clone for StateModule<S> {
    fn clone(&self) -> Self { Self { storage: self.storage.clone(), state: self.state.clone() } }
}

impl<S: KeyValueStorage> StateModule<S> {
    pub fn new(storage: Arc<S>) -> Self {
        let state = storage.state();
        Self { storage, state }
    }

    pub fn name(&self) -> &'static str { "StateX" }

    pub fn storage(&self) -> &Arc<S> { &self.storage }

    pub fn state(&self) -> ModuleState { self.state.get() }

    /// Host hook: (re)initialization
    pub fn on_init(&self) {
        debug!("{} initialized", self.name());
        self.state.activate();
    }

    /// Host hook: teardown. Later operations answer `DatabaseUnavailable` until [`Self::on_init`]; the wipe still runs.
    pub fn on_teardown(&self) {
        debug!("{} shutting down", self.name());
        self.state.shut_down();
    }

    /// Host hook: wipe all stored data. Runs during teardown too.
    ///
    /// Falls back to deleting the database file when clearing fails, even for a store that opted
    /// out of destructive recovery.
    ///
    /// # Panics
    ///
    /// When both clearing and deleting fail. A store that may still hold sensitive data must not
    /// carry on as if the wipe had happened.
    pub async fn on_sensitive_wipe(&self) -> WipeOutcome {
        let clear_err = match self.storage.wipe().await {
            Ok(()) => {
                debug!("Cleaned {}", self.name());
                return WipeOutcome::Cleared;
            }
            Err(err) => err,
        };
        warn!("Clearing {} failed, deleting the database instead: {}", self.name(), clear_err);
        match self.storage.delete_database().await {
            Ok(true) => {
                debug!("Deleted local database {}", self.name());
                WipeOutcome::Deleted
            }
            Ok(false) | Err(_) => {
                error!("Clearing and deleting database failed: {}", clear_err);
                panic!("Clearing and deleting database failed: {}", clear_err)
            }
        }
    }

    pub async fn get_many(&self, keys: Vec<String>) -> Result<Vec<(String, Option<String>)>, StoreError> {
        self.storage.get_many(keys).await
    }

    pub async fn set_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
        if pairs.is_empty() {
            return Err(StoreError::InvalidKey);
        }
        self.storage.set_many(pairs).await
    }

    pub async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Err(StoreError::InvalidKey);
        }
        self.storage.remove_many(keys).await
    }

    pub async fn merge_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> { self.storage.merge_many(pairs).await }

    pub async fn clear(&self) -> Result<(), StoreError> { self.storage.clear().await }

    pub async fn all_keys(&self) -> Result<Vec<String>, StoreError> { self.storage.all_keys().await }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> { self.storage.subscribe() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{ChangeKind, ChangeNotifier};
    use crate::merge::merge_values;
    use crate::pair::{pair, validate_pairs};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory backend with switchable failures
    #[derive(Default)]
    struct MemoryStorage {
        rows: Mutex<BTreeMap<String, String>>,
        state: StateHandle,
        notifier: ChangeNotifier,
        fail_clear: AtomicBool,
        fail_delete: AtomicBool,
        calls: AtomicUsize,
    }

    impl MemoryStorage {
        fn gate(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.state.is_shutting_down() {
                return Err(StoreError::DatabaseUnavailable);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStorage for MemoryStorage {
        async fn get_many(&self, keys: Vec<String>) -> Result<Vec<(String, Option<String>)>, StoreError> {
            self.gate()?;
            let rows = self.rows.lock().unwrap();
            Ok(keys.into_iter().map(|k| (k.clone(), rows.get(&k).cloned())).collect())
        }

        async fn set_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
            self.gate()?;
            let pairs = validate_pairs(pairs)?;
            let keys = pairs.iter().map(|(k, _)| k.clone()).collect();
            self.rows.lock().unwrap().extend(pairs);
            self.notifier.notify(StateChange::new(ChangeKind::Set, keys));
            Ok(())
        }

        async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
            self.gate()?;
            let mut rows = self.rows.lock().unwrap();
            for key in &keys {
                rows.remove(key);
            }
            Ok(())
        }

        async fn merge_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
            self.gate()?;
            let mut rows = self.rows.lock().unwrap();
            for (key, value) in validate_pairs(pairs)? {
                let merged = match rows.get(&key) {
                    Some(old) => merge_values(old, &value),
                    None => value,
                };
                rows.insert(key, merged);
            }
            Ok(())
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.gate()?;
            if self.fail_clear.load(Ordering::SeqCst) {
                return Err(StoreError::operation_failed("disk I/O error"));
            }
            self.rows.lock().unwrap().clear();
            Ok(())
        }

        async fn wipe(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_clear.load(Ordering::SeqCst) {
                return Err(StoreError::operation_failed("disk I/O error"));
            }
            self.rows.lock().unwrap().clear();
            Ok(())
        }

        async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
            self.gate()?;
            Ok(self.rows.lock().unwrap().keys().cloned().collect())
        }

        async fn delete_database(&self) -> Result<bool, StoreError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.rows.lock().unwrap().clear();
            Ok(true)
        }

        fn state(&self) -> StateHandle { self.state.clone() }

        fn subscribe(&self) -> broadcast::Receiver<StateChange> { self.notifier.subscribe() }
    }

    fn module() -> StateModule<MemoryStorage> { StateModule::new(Arc::new(MemoryStorage::default())) }

    #[tokio::test]
    async fn empty_batches() {
        let module = module();
        assert_eq!(module.set_many(vec![]).await, Err(StoreError::InvalidKey));
        assert_eq!(module.remove_many(vec![]).await, Err(StoreError::InvalidKey));
        assert_eq!(module.merge_many(vec![]).await, Ok(()));
        assert_eq!(module.get_many(vec![]).await, Ok(vec![]));
        // rejected before reaching storage
        assert_eq!(module.storage().calls.load(Ordering::SeqCst), 2);

        module.on_teardown();
        assert_eq!(module.set_many(vec![]).await, Err(StoreError::InvalidKey));
        assert_eq!(module.remove_many(vec![]).await, Err(StoreError::InvalidKey));
        assert_eq!(module.storage().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn teardown_gates_until_init() {
        let module = module();
        module.set_many(vec![pair("a", "1")]).await.unwrap();

        module.on_teardown();
        assert_eq!(module.state(), ModuleState::ShuttingDown);
        assert_eq!(module.get_many(vec!["a".into()]).await, Err(StoreError::DatabaseUnavailable));
        assert_eq!(module.set_many(vec![pair("a", "2")]).await, Err(StoreError::DatabaseUnavailable));
        assert_eq!(module.all_keys().await, Err(StoreError::DatabaseUnavailable));

        module.on_init();
        assert_eq!(module.get_many(vec!["a".into()]).await, Ok(vec![("a".to_string(), Some("1".to_string()))]));
    }

    #[tokio::test]
    async fn wipe_clears() {
        let module = module();
        module.set_many(vec![pair("secret", "1")]).await.unwrap();
        assert_eq!(module.on_sensitive_wipe().await, WipeOutcome::Cleared);
        assert_eq!(module.all_keys().await, Ok(vec![]));
    }

    #[tokio::test]
    async fn wipe_runs_during_teardown() {
        let module = module();
        module.set_many(vec![pair("secret", "1")]).await.unwrap();
        module.on_teardown();
        assert_eq!(module.on_sensitive_wipe().await, WipeOutcome::Cleared);
        module.on_init();
        assert_eq!(module.all_keys().await, Ok(vec![]));
    }

    #[tokio::test]
    async fn wipe_falls_back_to_delete() {
        let module = module();
        module.set_many(vec![pair("secret", "1")]).await.unwrap();
        module.storage().fail_clear.store(true, Ordering::SeqCst);
        assert_eq!(module.on_sensitive_wipe().await, WipeOutcome::Deleted);
        assert_eq!(module.all_keys().await, Ok(vec![]));
    }

    #[tokio::test]
    #[should_panic(expected = "Clearing and deleting database failed")]
    async fn wipe_panics_when_everything_fails() {
        let module = module();
        module.storage().fail_clear.store(true, Ordering::SeqCst);
        module.storage().fail_delete.store(true, Ordering::SeqCst);
        module.on_sensitive_wipe().await;
    }

    #[tokio::test]
    async fn notifications_pass_through() {
        let module = module();
        let mut rx = module.subscribe();
        module.set_many(vec![pair("a", "1"), pair("b", "2")]).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Set);
        assert_eq!(change.keys, vec!["a", "b"]);
    }
}
