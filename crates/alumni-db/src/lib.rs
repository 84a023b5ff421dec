pub mod directory;
pub mod error;
pub mod history;
pub mod migrations;
pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use directory::Directory;
pub use error::{DbError, Result, UniqueField};
pub use history::ChatHistory;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        info!(
            "Database opened at {} ({} members, {} messages)",
            path.display(),
            db.count_users()?,
            db.count_messages()?
        );
        Ok(db)
    }

    /// Private in-memory store, gone when dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }
}
