use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::changes::StateChange;
use crate::error::StoreError;
use crate::pair::RawPair;
use crate::state::StateHandle;

/// The batched key-value operations a storage backend provides.
///
/// Implementations serialize every call through one unit of work at a time and consult their
/// [`StateHandle`] before touching storage, answering `DatabaseUnavailable` while shutting down.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Each requested key paired with its value, or `None` when absent. Order is unspecified.
    async fn get_many(&self, keys: Vec<String>) -> Result<Vec<(String, Option<String>)>, StoreError>;

    /// Upsert every pair, or none of them.
    async fn set_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError>;

    /// Delete the given keys. Missing keys are ignored.
    async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError>;

    /// JSON deep merge each value into the stored one, or none of them.
    async fn merge_many(&self, pairs: Vec<RawPair>) -> Result<(), StoreError>;

    /// Delete every entry.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Delete every entry, even while shutting down. Used by the sensitive-data wipe.
    async fn wipe(&self) -> Result<(), StoreError>;

    /// Every stored key, in storage order.
    async fn all_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Close the database and delete its backing file, even while shutting down.
    /// Returns whether the file was deleted.
    async fn delete_database(&self) -> Result<bool, StoreError>;

    /// The state handle this backend gates on.
    fn state(&self) -> StateHandle;

    fn subscribe(&self) -> broadcast::Receiver<StateChange>;
}
