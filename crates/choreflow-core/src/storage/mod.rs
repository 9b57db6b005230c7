mod config;
pub mod database;
pub mod memory;

pub use config::{Config, HistoryConfig, StreakConfig, WorkflowConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{ChoreError, Result, StorageError};

/// Store keys, one per logical collection.
pub mod keys {
    pub const COMPLETIONS: &str = "completions";
    pub const STREAKS: &str = "streaks";
    pub const HOLIDAY_EXCEPTIONS: &str = "holiday_exceptions";
    pub const STREAK_HISTORY: &str = "streak_history";
    pub const STREAK_METADATA: &str = "streak_metadata";
}

/// Returns `~/.config/choreflow[-dev]/` based on CHOREFLOW_ENV.
///
/// Set CHOREFLOW_ENV=dev to use development data directory, or
/// CHOREFLOW_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CHOREFLOW_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CHOREFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("choreflow-dev")
            } else {
                base_dir.join("choreflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// JSON key-value store.
///
/// `update` is the only way to read-modify-write. Two writers of the same key
/// never interleave: the memory store holds a per-key lock for the whole
/// closure, the SQLite store a write transaction. Closures may `get` other
/// keys but must not write to the store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<Value>;
}

/// One mutex per store key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> Result<R, StorageError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| StorageError::Poisoned(key.to_string()))?;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let _guard = lock
            .lock()
            .map_err(|_| StorageError::Poisoned(key.to_string()))?;
        Ok(f())
    }
}

/// Load a typed value, falling back to `T::default()` when the key is unset.
pub fn read_json<T>(store: &dyn KvStore, key: &str) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    match store.get(key)? {
        Some(value) => serde_json::from_value(value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// Atomic typed read-modify-write of one key.
///
/// `f` may run at most once; its return value is handed back to the caller.
pub fn update_json<T, R>(
    store: &dyn KvStore,
    key: &str,
    mut f: impl FnMut(&mut T) -> Result<R>,
) -> Result<R>
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut output = None;
    store.update(key, &mut |current| {
        let mut value: T = match current {
            Some(raw) => serde_json::from_value(raw).map_err(|source| StorageError::Serialization {
                key: key.to_string(),
                source,
            })?,
            None => T::default(),
        };
        output = Some(f(&mut value)?);
        serde_json::to_value(&value).map_err(|source| {
            ChoreError::from(StorageError::Serialization {
                key: key.to_string(),
                source,
            })
        })
    })?;
    output.ok_or_else(|| StorageError::QueryFailed(format!("update of '{key}' produced no result")).into())
}

/// A list of records stored under one key.
pub struct Collection<T> {
    store: Arc<dyn KvStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KvStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn load(&self) -> Result<Vec<T>, StorageError> {
        read_json(self.store.as_ref(), self.key)
    }

    /// Atomically mutate the whole list.
    pub fn mutate<R>(&self, f: impl FnMut(&mut Vec<T>) -> Result<R>) -> Result<R> {
        update_json(self.store.as_ref(), self.key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn collection_defaults_to_empty() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let numbers: Collection<u32> = Collection::new(store, "numbers");
        assert!(numbers.load().unwrap().is_empty());
    }

    #[test]
    fn mutate_returns_closure_result() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let numbers: Collection<u32> = Collection::new(store, "numbers");
        let len = numbers
            .mutate(|items| {
                items.push(7);
                Ok(items.len())
            })
            .unwrap();
        assert_eq!(len, 1);
        assert_eq!(numbers.load().unwrap(), vec![7]);
    }

    #[test]
    fn failed_mutation_leaves_value_untouched() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let numbers: Collection<u32> = Collection::new(store, "numbers");
        numbers.mutate(|items| Ok(items.push(1))).unwrap();

        let err = numbers
            .mutate(|items| -> Result<()> {
                items.push(2);
                Err(ChoreError::invalid_input("n", "rejected"))
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(numbers.load().unwrap(), vec![1]);
    }

    #[test]
    fn concurrent_mutations_do_not_lose_writes() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let counter: Collection<u32> = Collection::new(Arc::clone(&store), "counter");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        counter
                            .mutate(|items| {
                                if items.is_empty() {
                                    items.push(0);
                                }
                                items[0] += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load().unwrap(), vec![200]);
    }
}
