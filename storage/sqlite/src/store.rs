use std::path::PathBuf;

use async_trait::async_trait;
use statex_core::{ChangeNotifier, KeyValueStorage, RawPair, SerialQueue, StateChange, StateHandle, StoreError};
use tokio::sync::broadcast;

use crate::config::StoreConfig;
use crate::engine::SqliteEngine;

const WORKER_NAME: &str = "statex-sqlite";

/// Async handle onto a SQLite-backed store.
///
/// Every call becomes one unit of work on a single worker thread, so calls from all handles run one
/// at a time in submission order. The database itself is opened lazily by the first call.
#[derive(Clone)]
pub struct SqliteStore {
    queue: SerialQueue<SqliteEngine>,
    state: StateHandle,
    notifier: ChangeNotifier,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(config: StoreConfig) -> anyhow::Result<Self> { Self::open_with_state(config, StateHandle::new()) }

    /// Like [`Self::open`], gating on an existing state handle.
    pub fn open_with_state(config: StoreConfig, state: StateHandle) -> anyhow::Result<Self> {
        let notifier = ChangeNotifier::new();
        let path = config.path();
        let engine = SqliteEngine::new(config, state.clone(), notifier.clone());
        let queue = SerialQueue::spawn(WORKER_NAME, engine)?;
        Ok(Self { queue, state, notifier, path })
    }

    /// Open a store kept in `~/<folder_name>`
    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> { Self::open(StoreConfig::with_homedir_folder(folder_name)?) }

    /// Path of the database file
    pub fn path(&self) -> &PathBuf { &self.path }

    /// Whether the worker currently holds an open handle
    pub async fn is_open(&self) -> bool { self.queue.run(|engine| engine.supplier().is_open()).await.unwrap_or(false) }
}

#[async_trait]
impl KeyValueStorage for SqliteStore {
    async fn get_many(&self, keys: Vec<String>) -> Result<Vec<(String, Option<String>)>, StoreError> {
        self.queue.run(move |engine| engine.get_many(keys)).await?
    }

    async fn set_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> { self.queue.run(move |engine| engine.set_many(pairs)).await? }

    async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
        self.queue.run(move |engine| engine.remove_many(keys)).await?
    }

    async fn merge_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError> {
        self.queue.run(move |engine| engine.merge_many(pairs)).await?
    }

    async fn clear(&self) -> Result<(), StoreError> { self.queue.run(|engine| engine.clear()).await? }

    async fn wipe(&self) -> Result<(), StoreError> { self.queue.run(|engine| engine.wipe()).await? }

    async fn all_keys(&self) -> Result<Vec<String>, StoreError> { self.queue.run(|engine| engine.all_keys()).await? }

    async fn delete_database(&self) -> Result<bool, StoreError> { Ok(self.queue.run(|engine| engine.delete_database()).await?) }

    fn state(&self) -> StateHandle { self.state.clone() }

    fn subscribe(&self) -> broadcast::Receiver<StateChange> { self.notifier.subscribe() }
}
