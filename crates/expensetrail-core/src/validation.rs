//! Draft validation for new expenses.
//!
//! Failures carry user-facing messages; the presentation layer shows them
//! and nothing is queued or sent.

use thiserror::Error;

use crate::models::expense::parse_expense_date;
use crate::models::Expense;

/// Smallest accepted amount.
pub const MIN_AMOUNT: f64 = 0.01;

/// Largest accepted receipt image (5 MB).
pub const MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please choose a category")]
    MissingCategory,

    #[error("Amount must be at least 0.01")]
    InvalidAmount,

    #[error("Please choose a currency")]
    MissingCurrency,

    #[error("Please enter a valid date")]
    InvalidDate,

    #[error("Please select a valid image file")]
    ReceiptNotImage,

    #[error("File size must be less than 5MB")]
    ReceiptTooLarge,
}

/// Receipt attachment encoded as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub mime_type: String,
    pub size_bytes: usize,
    pub data_url: String,
}

impl Receipt {
    /// Parse `data:<mime>;base64,<payload>`. The size is the decoded length.
    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let rest = data_url.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime_type = meta.split(';').next().unwrap_or_default().to_string();
        let size_bytes = if meta.ends_with(";base64") {
            let padding = payload.chars().rev().take_while(|&c| c == '=').count();
            ((payload.len() / 4) * 3).saturating_sub(padding.min(2))
        } else {
            payload.len()
        };
        Some(Self {
            mime_type,
            size_bytes,
            data_url: data_url.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.mime_type.starts_with("image/") {
            return Err(ValidationError::ReceiptNotImage);
        }
        if self.size_bytes > MAX_RECEIPT_BYTES {
            return Err(ValidationError::ReceiptTooLarge);
        }
        Ok(())
    }
}

/// Raw input from the add-expense form.
#[derive(Debug, Clone, Default)]
pub struct ExpenseForm {
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub receipt: Option<Receipt>,
}

impl ExpenseForm {
    /// Check every field and build an unsaved draft without a USD amount.
    pub fn validate(&self) -> Result<Expense, ValidationError> {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCategory)?;

        let amount = self
            .amount
            .filter(|a| a.is_finite() && *a >= MIN_AMOUNT)
            .ok_or(ValidationError::InvalidAmount)?;

        let currency = self
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCurrency)?;

        let date = self
            .date
            .as_deref()
            .map(str::trim)
            .filter(|d| parse_expense_date(d).is_some())
            .ok_or(ValidationError::InvalidDate)?;

        if let Some(receipt) = &self.receipt {
            receipt.validate()?;
        }

        let mut draft = Expense::new(category, amount, currency, date);
        draft.receipt = self.receipt.as_ref().map(|r| r.data_url.clone());
        Ok(draft)
    }
}
