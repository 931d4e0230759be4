#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use statex_core::StateModule;
use statex_storage_sqlite::{SqliteStore, StoreConfig};
use tempfile::TempDir;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// A store in its own temporary directory. Keep the `TempDir` alive for the test's duration.
pub struct TestStore {
    pub dir: TempDir,
    pub module: StateModule<SqliteStore>,
}

impl TestStore {
    pub fn new() -> Self { Self::with_config(|config| config) }

    pub fn with_config(configure: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let module = open_module(configure(test_config(&dir)));
        Self { dir, module }
    }

    pub fn config(&self) -> StoreConfig { test_config(&self.dir) }
}

pub fn test_config(dir: &TempDir) -> StoreConfig { StoreConfig::new(dir.path()).retry_delay(Duration::from_millis(1)) }

pub fn open_module(config: StoreConfig) -> StateModule<SqliteStore> { StateModule::new(Arc::new(SqliteStore::open(config).unwrap())) }

pub fn keys(prefix: &str, count: usize) -> Vec<String> { (0..count).map(|i| format!("{prefix}{i}")).collect() }
