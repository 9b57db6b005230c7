//! SQLite-backed key-value store.
//!
//! Every collection lives as one JSON document in the `kv` table:
//! - `completions`, `streaks`, `holiday_exceptions`
//! - `streak_history` (bounded ring) and `streak_metadata`

use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{data_dir, KvStore};
use crate::error::{Result, StorageError};

/// How long a writer waits for another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite database holding the key-value table.
///
/// Writes run inside `BEGIN IMMEDIATE` transactions, so handles in other
/// threads or processes opened on the same file never interleave a
/// read-modify-write.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Serializes writers of this handle; held for a whole transaction.
    writer: Mutex<()>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open the store at `~/.config/choreflow/choreflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("choreflow.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
            writer: Mutex::new(()),
            path: Some(path.to_path_buf()),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            writer: Mutex::new(()),
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Poisoned("connection".to_string()))
    }

    fn writer(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Poisoned("writer".to_string()))
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Run `body` inside a write transaction and commit it on success.
    ///
    /// The connection mutex is only taken per statement, so `body` may read
    /// through `self.get`; those reads see the transaction's view.
    fn write_transaction<R>(&self, body: impl FnOnce() -> Result<R>) -> Result<R> {
        let _writer = self.writer()?;
        self.conn()?.execute_batch("BEGIN IMMEDIATE TRANSACTION;").map_err(StorageError::from)?;

        match body() {
            Ok(value) => {
                let conn = self.conn()?;
                if let Err(e) = conn.execute_batch("COMMIT;") {
                    let _ = conn.execute_batch("ROLLBACK;");
                    return Err(StorageError::from(e).into());
                }
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn()?.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<Value>, StorageError> {
    let result = conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    });
    let raw = match result {
        Ok(v) => Some(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

fn write_value(conn: &Connection, key: &str, value: &Value) -> Result<(), StorageError> {
    let text = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })?;
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
        params![key, text],
    )?;
    Ok(())
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        read_value(&*self.conn()?, key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let _writer = self.writer()?;
        write_value(&*self.conn()?, key, value)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<Value> {
        self.write_transaction(|| {
            let next = apply(self.get(key)?)?;
            write_value(&*self.conn()?, key, &next)?;
            Ok(next)
        })
    }
}
