//! Network reachability oracle and the connectivity-restored signal.

use tokio::sync::watch;
use tracing::debug;

/// Answers "am I online?" at call time. Callers never cache the answer.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Settable reachability flag.
///
/// Every change is published on a `watch` channel; a flip from offline to
/// online is what the sync trigger listens for.
#[derive(Debug)]
pub struct ConnectivityFlag {
    tx: watch::Sender<bool>,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Update reachability. Receivers are only notified on actual changes.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            debug!(online, "Connectivity changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}
