//! Database lifecycle: open, create, upgrade, recover and delete.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{SqliteError, SupplierError};
use crate::sql_builder;

const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Owns the single database handle.
///
/// All methods take `&mut self`: whoever owns the supplier has exclusive access to open, close and
/// delete, which is what keeps the handle consistent.
pub struct DatabaseSupplier {
    config: StoreConfig,
    db: Option<Connection>,
}

impl DatabaseSupplier {
    pub fn new(config: StoreConfig) -> Self { Self { config, db: None } }

    pub fn config(&self) -> &StoreConfig { &self.config }

    pub fn is_open(&self) -> bool { self.db.is_some() }

    /// Make sure the database is open. Returns immediately if it already is.
    pub fn ensure_open(&mut self) -> Result<(), SupplierError> { self.handle().map(|_| ()) }

    /// The live handle, opening it first if needed.
    ///
    /// A failed open is retried exactly once after [`StoreConfig::delay`]. Unless destructive
    /// recovery is disabled, the database file is deleted before that retry.
    pub fn handle(&mut self) -> Result<&mut Connection, SupplierError> {
        let conn = match self.db.take() {
            Some(conn) => conn,
            None => self.open_with_retry()?,
        };
        Ok(self.db.insert(conn))
    }

    /// Close the handle if open and delete the database file along with its journals.
    /// Returns whether the database file itself was deleted.
    pub fn destroy(&mut self) -> bool {
        if let Some(conn) = self.db.take() {
            if let Err((_, err)) = conn.close() {
                warn!("Failed to close database cleanly: {}", err);
            }
        }
        let path = self.config.path();
        let deleted = remove_file(&path);
        for suffix in SIDECAR_SUFFIXES {
            remove_file(&sidecar_path(&path, suffix));
        }
        debug!("Deleted database {}: {}", path.display(), deleted);
        deleted
    }

    fn open_with_retry(&mut self) -> Result<Connection, SupplierError> {
        let first = match self.open() {
            Ok(conn) => return Ok(conn),
            Err(err) => err,
        };
        warn!("Opening database {} failed, retrying: {}", self.config.path().display(), first);
        thread::sleep(self.config.delay());

        if self.config.recovers_destructively() {
            warn!("Deleting database {} before retrying", self.config.path().display());
            self.destroy();
        }

        self.open().map_err(|source| SupplierError { path: self.config.path().display().to_string(), attempts: 2, source })
    }

    fn open(&self) -> Result<Connection, SqliteError> {
        fs::create_dir_all(self.config.directory())?;
        let conn = Connection::open(self.config.path())?;
        conn.execute_batch("PRAGMA synchronous=NORMAL; PRAGMA temp_store=MEMORY;")?;
        self.migrate(&conn)?;
        apply_max_size(&conn, self.config.max_size_bytes())?;
        Ok(conn)
    }

    /// Create the table on a fresh file, or drop and recreate it on any version mismatch.
    fn migrate(&self, conn: &Connection) -> Result<(), SqliteError> {
        let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let target = self.config.version();
        if current == target {
            return Ok(());
        }

        let tx = conn.unchecked_transaction()?;
        if current == 0 {
            debug!("Creating state table, version {}", target);
        } else {
            info!("Upgrading database from version {} to {}, existing entries are dropped", current, target);
            tx.execute(&sql_builder::drop_table(), [])?;
        }
        tx.execute(&sql_builder::create_table(), [])?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", target))?;
        tx.commit()?;
        Ok(())
    }
}

/// Cap the file at `max_size` bytes, rounded up to whole pages.
fn apply_max_size(conn: &Connection, max_size: u64) -> Result<i64, SqliteError> {
    let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
    let page_size = page_size.max(1) as u64;
    let pages = max_size.div_ceil(page_size);
    let applied: i64 = conn.query_row(&format!("PRAGMA max_page_count = {}", pages), [], |row| row.get(0))?;
    debug!("Database size capped at {} pages of {} bytes", applied, page_size);
    Ok(applied)
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == ErrorKind::NotFound => false,
        Err(err) => {
            warn!("Failed to delete {}: {}", path.display(), err);
            false
        }
    }
}
