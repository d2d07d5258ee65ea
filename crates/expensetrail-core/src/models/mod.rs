//! Data models for expenses, categories and exchange rates.
//!
//! - `Expense`, `ExpenseId`: server records and offline placeholders
//! - `Category`: expense categories with display metadata
//! - `RatesTable`: USD-based exchange rates

pub mod category;
pub mod expense;
pub mod rates;

pub use category::{seed_categories, Category};
pub use expense::{seed_expenses, Expense, ExpenseId, LOCAL_ID_PREFIX};
pub use rates::{RatesTable, DEFAULT_CURRENCIES};
