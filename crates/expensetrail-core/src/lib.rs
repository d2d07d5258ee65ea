//! Core library for expensetrail.
//!
//! Offline-first plumbing for the expense tracker:
//! - `OutboxQueue`: durable FIFO of writes that could not reach the server
//! - `CachedResourceStore`: cache-then-network reads for expenses,
//!   categories and exchange rates, plus offline-capable expense creation
//!   and outbox replay with local-id reconciliation
//! - `dashboard`: period filters, paging and spending summaries
//!
//! Collaborators (storage, connectivity, HTTP, clock) are traits so the
//! stores can be constructed once and injected wherever they are needed.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod conversion;
pub mod dashboard;
mod id;
pub mod models;
pub mod outbox;
pub mod storage;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod validation;

pub use api::{ApiClient, ApiError, HttpTransport};
pub use cache::{CachedResourceStore, Endpoints, ResourceCache, SyncReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use models::{Category, Expense, ExpenseId, RatesTable};
pub use outbox::{Method, OutboxItem, OutboxQueue, WriteOperation};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PersistenceError, PersistenceObserver};
