use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Categories offered when the server and the cache have nothing.
pub fn seed_categories() -> Vec<Category> {
    [
        ("groceries", "Groceries", "fas fa-shopping-cart"),
        ("entertainment", "Entertainment", "fas fa-film"),
        ("gas", "Gas", "fas fa-gas-pump"),
        ("shopping", "Shopping", "fas fa-shopping-bag"),
        ("transport", "Transport", "fas fa-car"),
        ("rent", "Rent", "fas fa-home"),
        ("food", "Food", "fas fa-utensils"),
        ("healthcare", "Healthcare", "fas fa-heart"),
    ]
    .into_iter()
    .map(|(id, label, icon)| Category {
        id: id.to_string(),
        label: label.to_string(),
        icon: Some(icon.to_string()),
    })
    .collect()
}
