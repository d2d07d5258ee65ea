//! Dashboard derivations over a fetched or cached expense list.
//!
//! Filtering by period, incremental paging and the income/expense summary.
//! These are pure functions of the list and the current date.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::cache::ResourceCache;
use crate::conversion::round2;
use crate::models::Expense;

/// Key holding the selected period label, stored as plain text.
pub const DASHBOARD_FILTER_KEY: &str = "dashboard:filter";

/// How many expenses the dashboard pulls before filtering locally.
pub const DASHBOARD_FETCH_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    Last7Days,
    #[default]
    ThisMonth,
    ThisYear,
    AllTime,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Last7Days,
        Period::ThisMonth,
        Period::ThisYear,
        Period::AllTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Last7Days => "Last 7 Days",
            Period::ThisMonth => "This Month",
            Period::ThisYear => "This Year",
            Period::AllTime => "All Time",
        }
    }

    /// First day included, or `None` for no lower bound.
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Last7Days => Some(today - Duration::days(6)),
            Period::ThisMonth => today.with_day(1),
            Period::ThisYear => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            Period::AllTime => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts the display labels and a few short forms (`7d`, `month`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "last 7 days" | "7d" | "week" => Ok(Period::Last7Days),
            "this month" | "month" => Ok(Period::ThisMonth),
            "this year" | "year" => Ok(Period::ThisYear),
            "all time" | "all" => Ok(Period::AllTime),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

/// Expenses dated on or after the period start. Records without a
/// readable date are dropped for every period.
pub fn filter_by_period(expenses: &[Expense], period: Period, today: NaiveDate) -> Vec<Expense> {
    let start = period.start_date(today);
    expenses
        .iter()
        .filter(|expense| match (expense.parsed_date(), start) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(date), Some(start)) => date >= start,
        })
        .cloned()
        .collect()
}

/// Items in `[(page-1)*limit, page*limit)`. Pages start at 1.
pub fn page_window<T: Clone>(items: &[T], page: usize, limit: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(limit);
    items.iter().skip(start).take(limit).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Summary {
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

/// Totals over the effective (USD when known) amounts.
///
/// A positive amount counts toward both income and expenses; a negative
/// one counts its absolute value toward expenses only.
pub fn summarize(expenses: &[Expense]) -> Summary {
    let mut income = 0.0;
    let mut spent = 0.0;
    for expense in expenses {
        let amount = expense.effective_amount();
        if amount > 0.0 {
            income += amount;
            spent += amount;
        } else {
            spent += amount.abs();
        }
    }
    Summary {
        income: round2(income),
        expenses: round2(spent),
        balance: round2(income - spent),
    }
}

/// Incrementally revealed list for infinite scrolling.
#[derive(Debug, Clone)]
pub struct ExpenseFeed {
    filtered: Vec<Expense>,
    displayed: Vec<Expense>,
    next_page: usize,
    limit: usize,
    has_more: bool,
}

impl ExpenseFeed {
    /// New feed with the first page already loaded.
    pub fn new(filtered: Vec<Expense>, limit: usize) -> Self {
        let mut feed = Self {
            filtered,
            displayed: Vec::new(),
            next_page: 1,
            limit: limit.max(1),
            has_more: true,
        };
        feed.load_more();
        feed
    }

    /// Append the next page and return how many records were added.
    pub fn load_more(&mut self) -> usize {
        let start = (self.next_page - 1) * self.limit;
        let end = start + self.limit;
        let page = page_window(&self.filtered, self.next_page, self.limit);
        let added = page.len();
        if added > 0 {
            self.displayed.extend(page);
            self.next_page += 1;
        }
        self.has_more = end < self.filtered.len();
        added
    }

    pub fn displayed(&self) -> &[Expense] {
        &self.displayed
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total(&self) -> usize {
        self.filtered.len()
    }
}

/// Everything the dashboard shows for one period.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub period: Period,
    pub summary: Summary,
    pub feed: ExpenseFeed,
}

impl DashboardView {
    pub fn build(all: &[Expense], period: Period, today: NaiveDate, page_size: usize) -> Self {
        let filtered = filter_by_period(all, period, today);
        let summary = summarize(&filtered);
        Self {
            period,
            summary,
            feed: ExpenseFeed::new(filtered, page_size),
        }
    }
}

/// Last selected period, defaulting to "This Month".
pub fn load_period(cache: &ResourceCache) -> Period {
    cache
        .load_text(DASHBOARD_FILTER_KEY)
        .and_then(|label| label.parse().ok())
        .unwrap_or_default()
}

pub fn save_period(cache: &ResourceCache, period: Period) {
    cache.save_text(DASHBOARD_FILTER_KEY, period.label());
}
