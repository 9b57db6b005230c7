//! In-process key-value store.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{KeyLocks, KvStore};
use crate::error::{Result, StorageError};

/// HashMap-backed [`KvStore`] for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Value>>,
    locks: KeyLocks,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently set.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::Poisoned(key.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Poisoned(key.to_string()))?;
        data.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<Value> {
        self.locks.with_lock(key, || -> Result<Value> {
            let next = apply(self.get(key)?)?;
            self.set(key, &next)?;
            Ok(next)
        })?
    }
}
