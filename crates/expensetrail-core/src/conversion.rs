//! Currency conversion to USD against an explicit rates table.

use thiserror::Error;

use crate::models::RatesTable;

pub const BASE_CURRENCY: &str = "USD";

/// User-facing reasons a USD amount could not be computed. The amount is
/// still saved, unconverted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionNotice {
    #[error("Unable to convert {0} to USD")]
    UnsupportedCurrency(String),

    #[error("Currency conversion unavailable, saving without conversion")]
    RatesUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount_usd: f64,
    pub notice: Option<ConversionNotice>,
}

/// Live preview shown while an amount is being typed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionPreview {
    pub rate: f64,
    pub amount_usd: f64,
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `amount` in a currency quoted at `rate` units per USD.
pub fn convert(amount: f64, rate: f64) -> f64 {
    round2(amount / rate)
}

fn usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// USD equivalent for saving. Falls back to the raw amount with a notice
/// when the currency is unknown or no table is available.
pub fn to_usd(amount: f64, currency: &str, rates: Option<&RatesTable>) -> Conversion {
    if currency == BASE_CURRENCY {
        return Conversion {
            amount_usd: round2(amount),
            notice: None,
        };
    }

    let Some(rates) = rates else {
        return Conversion {
            amount_usd: amount,
            notice: Some(ConversionNotice::RatesUnavailable),
        };
    };

    match rates.rate(currency).filter(|r| usable(*r)) {
        Some(rate) => Conversion {
            amount_usd: convert(amount, rate),
            notice: None,
        },
        None => Conversion {
            amount_usd: amount,
            notice: Some(ConversionNotice::UnsupportedCurrency(currency.to_string())),
        },
    }
}

/// `None` for USD, non-positive amounts, or unknown currencies.
pub fn preview(amount: f64, currency: &str, rates: &RatesTable) -> Option<ConversionPreview> {
    if amount <= 0.0 || currency.is_empty() || currency == BASE_CURRENCY {
        return None;
    }
    let rate = rates.rate(currency).filter(|r| usable(*r))?;
    Some(ConversionPreview {
        rate,
        amount_usd: convert(amount, rate),
    })
}
