use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the database inside its directory
pub const DATABASE_NAME: &str = "StateXStorage";

pub const DATABASE_VERSION: u32 = 1;

/// Keeps the app from storing too much and the file from filling the disk cache.
pub const DEFAULT_MAX_DB_SIZE: u64 = 6 * 1024 * 1024;

/// Pause before the second open attempt
pub const RETRY_DELAY: Duration = Duration::from_millis(30);

pub const TABLE_STATE: &str = "state";
pub const KEY_COLUMN: &str = "key";
pub const VALUE_COLUMN: &str = "value";

/// Where and how the database is kept
#[derive(Clone, Debug)]
pub struct StoreConfig {
    directory: PathBuf,
    name: String,
    schema_version: u32,
    max_size: u64,
    retry_delay: Duration,
    destructive_recovery: bool,
}

impl StoreConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            name: DATABASE_NAME.to_owned(),
            schema_version: DATABASE_VERSION,
            max_size: DEFAULT_MAX_DB_SIZE,
            retry_delay: RETRY_DELAY,
            destructive_recovery: true,
        }
    }

    /// Keep the database in `~/<folder_name>`
    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> {
        let dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?.join(folder_name);
        Ok(Self::new(dir))
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bumping this drops every stored entry on the next open. Versions start at 1.
    pub fn schema_version(mut self, version: u32) -> Self {
        self.schema_version = version.max(1);
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Whether an unopenable database file is deleted before the retry. On by default.
    pub fn destructive_recovery(mut self, enabled: bool) -> Self {
        self.destructive_recovery = enabled;
        self
    }

    pub fn directory(&self) -> &Path { &self.directory }

    pub fn path(&self) -> PathBuf { self.directory.join(&self.name) }

    pub fn version(&self) -> u32 { self.schema_version }

    pub fn max_size_bytes(&self) -> u64 { self.max_size }

    pub fn delay(&self) -> Duration { self.retry_delay }

    pub fn recovers_destructively(&self) -> bool { self.destructive_recovery }
}
