//! Application configuration management.
//!
//! Configuration is stored at `~/.config/covidash/config.json`. Every field
//! is optional on disk; missing values fall back to defaults. The API base
//! URL can also be overridden with the `COVIDASH_API_URL` environment
//! variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "covidash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "COVIDASH_API_URL";

/// Regions and worldwide totals change at most daily upstream.
const DEFAULT_TTL_HOURS: u64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub region_ttl_hours: Option<u64>,
    pub summary_ttl_hours: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    /// Country selected when the app last exited, restored on start.
    pub last_region_iso: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = Some(url);
            }
        }
        self
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn region_ttl(&self) -> Duration {
        hours(self.region_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS))
    }

    pub fn summary_ttl(&self) -> Duration {
        hours(self.summary_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(60 * 60))
}
