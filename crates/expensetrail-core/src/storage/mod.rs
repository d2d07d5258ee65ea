//! Key-value persistence behind the caches and the outbox.
//!
//! The stores are synchronous and best-effort, mirroring browser local
//! storage: reads return `None` for anything missing or unreadable, writes
//! report failures as `PersistenceError` so an observer can log them while
//! the caller carries on with its in-memory result.

pub mod file;
pub mod memory;

use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Failed to serialize value for {key}: {reason}")]
    Serialize { key: String, reason: String },

    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to remove {key}: {reason}")]
    Remove { key: String, reason: String },
}

impl PersistenceError {
    pub fn key(&self) -> &str {
        match self {
            PersistenceError::Serialize { key, .. }
            | PersistenceError::Write { key, .. }
            | PersistenceError::Remove { key, .. } => key,
        }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Receives durability failures that the stores do not propagate.
pub trait PersistenceObserver: Send + Sync {
    fn on_persistence_error(&self, error: &PersistenceError);
}

/// Default observer: logs and moves on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PersistenceObserver for LogObserver {
    fn on_persistence_error(&self, error: &PersistenceError) {
        warn!(key = error.key(), error = %error, "Persistence failed, keeping result in memory only");
    }
}

/// Observer that keeps every reported error, for status displays and tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    errors: Mutex<Vec<PersistenceError>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<PersistenceError> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PersistenceObserver for RecordingObserver {
    fn on_persistence_error(&self, error: &PersistenceError) {
        LogObserver.on_persistence_error(error);
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(error.clone());
    }
}
