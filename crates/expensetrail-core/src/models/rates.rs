use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Currency choices when no rates table is available.
pub const DEFAULT_CURRENCIES: [&str; 4] = ["USD", "EUR", "GBP", "EGP"];

/// Exchange rates as served by the rate API: units of each currency per
/// one unit of `base_code`. Fields the client does not use are kept so the
/// cached snapshot matches what was served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RatesTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_code: Option<String>,
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RatesTable {
    pub fn base(&self) -> &str {
        self.base_code.as_deref().unwrap_or("USD")
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Known currency codes, sorted.
    pub fn currency_codes(&self) -> Vec<String> {
        self.rates.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "time_last_update_unix": 1717200000,
        "rates": { "USD": 1, "EUR": 0.92, "EGP": 47.5 }
    }"#;

    #[test]
    fn test_parse_rate_api_payload() {
        let table: RatesTable = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(table.base(), "USD");
        assert_eq!(table.rate("EUR"), Some(0.92));
        assert_eq!(table.currency_codes(), vec!["EGP", "EUR", "USD"]);
        assert_eq!(table.extra["result"], "success");
    }

    #[test]
    fn test_extra_fields_round_trip_into_cache() {
        let table: RatesTable = serde_json::from_str(SAMPLE).unwrap();
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["time_last_update_unix"], 1717200000);
    }
}
