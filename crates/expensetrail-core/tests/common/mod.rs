#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use expensetrail_core::storage::{KeyValueStore, PersistenceObserver, RecordingObserver};
use expensetrail_core::testing::ScriptedTransport;
use expensetrail_core::{
    ApiError, CachedResourceStore, ConnectivityFlag, Endpoints, FileStore, FixedClock,
    MemoryStore, OutboxQueue, ResourceCache,
};

pub const API: &str = "http://api.test";
pub const RATES: &str = "http://rates.test/v6/latest/USD";

pub fn unavailable() -> ApiError {
    ApiError::ServerError("unavailable".into())
}

pub struct Harness {
    pub kv: Arc<dyn KeyValueStore>,
    pub api: Arc<ScriptedTransport>,
    pub online: Arc<ConnectivityFlag>,
    pub observer: Arc<RecordingObserver>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<CachedResourceStore>,
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

impl Harness {
    pub fn in_memory(online: bool) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), online)
    }

    pub fn on_disk(dir: &Path, online: bool) -> Self {
        let kv = FileStore::new(dir.to_path_buf()).expect("data dir");
        Self::with_store(Arc::new(kv), online)
    }

    pub fn with_store(kv: Arc<dyn KeyValueStore>, online: bool) -> Self {
        let api = Arc::new(ScriptedTransport::new());
        let online = Arc::new(ConnectivityFlag::new(online));
        let observer = Arc::new(RecordingObserver::new());
        let clock = Arc::new(FixedClock::at_date(today()));
        let dyn_observer: Arc<dyn PersistenceObserver> = observer.clone();
        let outbox = Arc::new(OutboxQueue::new(
            kv.clone(),
            dyn_observer.clone(),
            clock.clone(),
        ));
        let store = Arc::new(CachedResourceStore::new(
            ResourceCache::new(kv.clone(), dyn_observer),
            outbox,
            api.clone(),
            online.clone(),
            clock.clone(),
            Endpoints::new(API, RATES),
        ));
        Self {
            kv,
            api,
            online,
            observer,
            clock,
            store,
        }
    }
}
