//! SQLite persistence for the task collections.
//!
//! One connection behind a mutex serves every request. Reads and writes are
//! synchronous closures over that connection; [`store`] adapts them to the
//! async [`TaskStore`](crate::store::TaskStore) seam.

pub mod sql;
pub mod store;
pub mod tasks;
pub mod users;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

// File databases are shared with other processes (the API and CLI at once).
const FILE_PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA foreign_keys=ON;
     PRAGMA busy_timeout=5000;";
const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys=ON;";

/// Shared handle to the task database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the task database at `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?, FILE_PRAGMAS)
    }

    /// Fresh private database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, MEMORY_PRAGMAS)
    }

    fn init(conn: Connection, pragmas: &str) -> Result<Self> {
        conn.execute_batch(pragmas)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.with_conn_mut(|conn| {
            let report = embedded::migrations::runner().run(conn)?;
            for migration in report.applied_migrations() {
                debug!(migration = %migration, "applied schema migration");
            }
            Ok(())
        })?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("task database lock poisoned"))
    }

    /// Run `f` against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&*self.lock()?)
    }

    /// Run `f` with mutable access, for transactions.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        f(&mut *self.lock()?)
    }
}
