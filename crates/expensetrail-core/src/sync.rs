//! Background outbox replay.
//!
//! The store's `sync_outbox` does the work and guards against overlap;
//! these helpers decide when it runs: once at startup if online, then on
//! every offline-to-online transition.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CachedResourceStore, SyncReport};

/// Start a sync without waiting for it.
pub fn spawn_sync(store: Arc<CachedResourceStore>) -> JoinHandle<SyncReport> {
    tokio::spawn(async move { store.sync_outbox().await })
}

/// Run a sync now if `online` reports connectivity, then again each time
/// it flips back to online. Ends when the sender side is dropped.
pub fn watch_connectivity(
    store: Arc<CachedResourceStore>,
    mut online: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut was_online = *online.borrow_and_update();
        if was_online {
            debug!("Online at startup, syncing outbox");
            store.sync_outbox().await;
        }

        while online.changed().await.is_ok() {
            let now_online = *online.borrow_and_update();
            if now_online && !was_online {
                info!(pending = store.outbox().len(), "Connectivity restored, syncing outbox");
                store.sync_outbox().await;
            }
            was_online = now_online;
        }
        debug!("Connectivity source closed, stopping sync watcher");
    })
}
