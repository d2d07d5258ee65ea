//! Read-through caching for expenses, categories and exchange rates.
//!
//! `ResourceCache` owns the cache keys and serializes every
//! read-modify-write against them. `CachedResourceStore` layers the
//! cache-then-network read policy, offline-capable expense creation and
//! outbox replay on top of it.
//!
//! Persisted keys:
//! - `cache:expenses`: JSON array of expenses, newest first
//! - `cache:categories`: JSON array of categories
//! - `cache:rates`: the last rates table served

pub mod manager;
pub mod store;

pub use manager::ResourceCache;
pub use store::{
    CachedResource, CachedResourceStore, Endpoints, PreparedExpense, SyncReport, CATEGORIES_KEY,
    EXPENSES_KEY, RATES_KEY,
};
