//! Application configuration management.
//!
//! Holds the backend and rate-service URLs, the data directory for the
//! persistent store, and request/paging settings.
//!
//! Configuration is stored at `~/.config/expensetrail/config.json` and can
//! be overridden with `EXPENSETRAIL_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::Endpoints;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "expensetrail";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "EXPENSETRAIL_API_URL";
pub const ENV_RATES_URL: &str = "EXPENSETRAIL_RATES_URL";
pub const ENV_DATA_DIR: &str = "EXPENSETRAIL_DATA_DIR";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub rates_url: String,
    /// Overrides the platform cache directory.
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub page_size: usize,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            data_dir: None,
            request_timeout_secs: crate::api::client::DEFAULT_TIMEOUT_SECS,
            page_size: 10,
            log_to_file: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(ENV_RATES_URL) {
            self.rates_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the persistent key-value store lives.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api_base_url, &self.rates_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
