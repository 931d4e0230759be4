//! SQLite backend for StateX
//!
//! A single-file key-value store: one `state` table of `(key TEXT PRIMARY KEY, value TEXT NOT NULL)`
//! rows, capped at 6 MiB, served by one worker thread.
//!
//! - [`DatabaseSupplier`] owns the handle: lazy open, schema creation and version upgrade, the
//!   delete-and-retry recovery for unopenable files, and deletion of the whole database.
//! - [`SqliteEngine`] runs the batched operations, chunking keys to stay under SQLite's bound
//!   parameter limit and wrapping every mutation in one transaction.
//! - [`SqliteStore`] is the async, cloneable handle and implements
//!   [`statex_core::KeyValueStorage`].
//!
//! # Example
//!
//! ```rust,ignore
//! use statex_core::{pair, StateModule};
//! use statex_storage_sqlite::{SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::open(StoreConfig::new("/var/lib/myapp"))?;
//! let module = StateModule::new(Arc::new(store));
//! module.set_many(vec![pair("theme", r#"{"dark":true}"#)]).await?;
//! let values = module.get_many(vec!["theme".into()]).await?;
//! ```

mod config;
mod engine;
mod error;
mod sql_builder;
mod store;
mod supplier;

pub use config::{StoreConfig, DATABASE_NAME, DATABASE_VERSION, DEFAULT_MAX_DB_SIZE, RETRY_DELAY};
pub use engine::SqliteEngine;
pub use error::{SqliteError, SupplierError};
pub use store::SqliteStore;
pub use supplier::DatabaseSupplier;
