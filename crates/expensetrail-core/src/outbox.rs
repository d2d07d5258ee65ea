//! Durable FIFO of write operations waiting for connectivity.
//!
//! The whole queue lives under a single key as a JSON array. Insertion
//! order is replay order. A missing or corrupt value reads as an empty
//! queue; write failures go to the `PersistenceObserver` and the item only
//! survives in memory until the next load.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::id;
use crate::storage::{KeyValueStore, PersistenceError, PersistenceObserver};

pub const OUTBOX_KEY: &str = "offline:outbox";

/// Field name marking an outbox body with the local id of the record it
/// created.
pub const LOCAL_ID_FIELD: &str = "_localId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A write that could not be confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOperation {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxItem {
    pub id: String,
    pub url: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub created_at: i64,
}

impl OutboxItem {
    /// Local id carried in the body, for writes that created a placeholder.
    pub fn local_id(&self) -> Option<&str> {
        self.body.as_ref()?.get(LOCAL_ID_FIELD)?.as_str()
    }
}

pub struct OutboxQueue {
    store: Arc<dyn KeyValueStore>,
    observer: Arc<dyn PersistenceObserver>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl OutboxQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        observer: Arc<dyn PersistenceObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            observer,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an operation and persist the queue. Returns the queued item
    /// with its assigned id, even when persisting failed.
    pub fn push(&self, op: WriteOperation) -> OutboxItem {
        let _guard = self.lock();
        let mut items = self.read();
        let item = OutboxItem {
            id: id::timestamped(self.clock.now_millis()),
            url: op.url,
            method: op.method,
            body: op.body,
            created_at: op.created_at,
        };
        items.push(item.clone());
        self.write(&items);
        info!(id = %item.id, method = %item.method, url = %item.url, pending = items.len(), "Queued write for later sync");
        item
    }

    /// Pending items, oldest first.
    pub fn list(&self) -> Vec<OutboxItem> {
        self.read()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the item with `id`. No-op if it is not queued.
    pub fn remove(&self, id: &str) {
        let _guard = self.lock();
        let mut items = self.read();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() != before {
            self.write(&items);
        }
    }

    /// Empty the queue unconditionally.
    pub fn clear(&self) {
        let _guard = self.lock();
        if let Err(e) = self.store.remove(OUTBOX_KEY) {
            self.observer.on_persistence_error(&e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> Vec<OutboxItem> {
        let Some(raw) = self.store.get(OUTBOX_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                debug!(error = %e, "Outbox value is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    fn write(&self, items: &[OutboxItem]) {
        let result = serde_json::to_string(items)
            .map_err(|e| PersistenceError::Serialize {
                key: OUTBOX_KEY.to_string(),
                reason: e.to_string(),
            })
            .and_then(|json| self.store.set(OUTBOX_KEY, &json));
        if let Err(e) = result {
            self.observer.on_persistence_error(&e);
        }
    }
}
