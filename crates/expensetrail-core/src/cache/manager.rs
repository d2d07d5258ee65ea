use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::storage::{KeyValueStore, PersistenceError, PersistenceObserver};

/// Typed JSON access to the key-value store.
///
/// Writes go through a single lock so `update_list` callers never work from
/// a snapshot another writer is about to replace.
pub struct ResourceCache {
    store: Arc<dyn KeyValueStore>,
    observer: Arc<dyn PersistenceObserver>,
    write_lock: Mutex<()>,
}

impl ResourceCache {
    pub fn new(store: Arc<dyn KeyValueStore>, observer: Arc<dyn PersistenceObserver>) -> Self {
        Self {
            store,
            observer,
            write_lock: Mutex::new(()),
        }
    }

    /// Cached value for `key`. Missing and corrupt values both yield `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(cache = key, error = %e, "Cached value is corrupt, ignoring");
                None
            }
        }
    }

    /// Replace the value for `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let _guard = self.lock();
        self.write(key, value);
    }

    /// Read-modify-write of a cached list under the write lock. A missing or
    /// corrupt list starts out empty.
    pub fn update_list<T, R>(&self, key: &str, f: impl FnOnce(&mut Vec<T>) -> R) -> R
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.lock();
        let mut list: Vec<T> = self.load(key).unwrap_or_default();
        let result = f(&mut list);
        self.write(key, &list);
        result
    }

    /// Raw string value, for small preferences stored without JSON encoding.
    pub fn load_text(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn save_text(&self, key: &str, value: &str) {
        let _guard = self.lock();
        if let Err(e) = self.store.set(key, value) {
            self.observer.on_persistence_error(&e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(|e| PersistenceError::Serialize {
                key: key.to_string(),
                reason: e.to_string(),
            })
            .and_then(|json| self.store.set(key, &json));
        if let Err(e) = result {
            self.observer.on_persistence_error(&e);
        }
    }
}
