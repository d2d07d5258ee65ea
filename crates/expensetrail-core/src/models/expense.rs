use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::id;

/// Prefix of ids minted for records created while offline.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Server ids are numeric; offline placeholders are `local-<millis>-<random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum ExpenseId {
    Number(i64),
    Text(String),
}

impl ExpenseId {
    pub fn local(now: DateTime<Utc>) -> Self {
        ExpenseId::Text(format!(
            "{}{}",
            LOCAL_ID_PREFIX,
            id::timestamped(now.timestamp_millis())
        ))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ExpenseId::Text(s) if s.starts_with(LOCAL_ID_PREFIX))
    }

    /// True when this id is the textual id `other`.
    pub fn matches_text(&self, other: &str) -> bool {
        matches!(self, ExpenseId::Text(s) if s == other)
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseId::Number(n) => write!(f, "{}", n),
            ExpenseId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Absent on drafts that have not been saved yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExpenseId>,
    pub category: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,
    /// `YYYY-MM-DD`, as entered.
    #[serde(default)]
    pub date: String,
    /// Receipt image as a data URL.
    #[serde(default)]
    pub receipt: Option<String>,
}

impl Expense {
    pub fn new(category: &str, amount: f64, currency: &str, date: &str) -> Self {
        Self {
            id: None,
            category: category.to_string(),
            amount,
            currency: Some(currency.to_string()),
            amount_usd: None,
            date: date.to_string(),
            receipt: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.id.as_ref().is_some_and(ExpenseId::is_local)
    }

    /// Amount used for totals: the USD amount when known.
    pub fn effective_amount(&self) -> f64 {
        self.amount_usd.unwrap_or(self.amount)
    }

    /// Calendar date of the expense, if `date` parses.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_expense_date(&self.date)
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, or anything starting with a
/// `YYYY-MM-DD` prefix.
pub fn parse_expense_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Built-in expenses shown when there is neither network nor cache.
pub fn seed_expenses(today: NaiveDate) -> Vec<Expense> {
    const SEED: [(i64, &str, f64, i64); 7] = [
        (1, "groceries", 120.0, 1),
        (2, "gas", 50.0, 2),
        (3, "entertainment", 45.0, 5),
        (4, "shopping", 200.0, 7),
        (5, "transport", 35.0, 10),
        (6, "food", 85.0, 12),
        (7, "rent", 1200.0, 15),
    ];

    SEED.iter()
        .map(|&(id, category, amount, days_ago)| Expense {
            id: Some(ExpenseId::Number(id)),
            category: category.to_string(),
            amount,
            currency: Some("USD".to_string()),
            amount_usd: Some(amount),
            date: (today - Duration::days(days_ago))
                .format("%Y-%m-%d")
                .to_string(),
            receipt: None,
        })
        .collect()
}
