// Viewer configuration, mirroring assets/config/default.json.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use shared::models::TimeFrame;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::state::sort::SortOrder;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub version: String,
    pub api: ApiSettings,
    pub view: ViewSettings,
    pub symbols: Vec<String>,
    pub timeframes: Vec<TimeFrame>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewSettings {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    /// Row ceiling sent with every list fetch.
    pub default_limit: usize,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ViewSettings {
    pub fn page_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_size).unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl AppConfig {
    // The default config is embedded so the binary runs from any directory.
    pub fn load_default() -> Result<Self> {
        let config_str = include_str!("../../assets/config/default.json");
        Self::from_json(config_str)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_json(&config_str).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_json(config_str: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects timeframes the viewer is not configured to browse.
    pub fn ensure_timeframe(&self, timeframe: TimeFrame) -> Result<()> {
        if !self.timeframes.contains(&timeframe) {
            return Err(anyhow!("Invalid timeframe '{}', configured: {:?}", timeframe, self.timeframes));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.view.page_size == 0 {
            return Err(anyhow!("view.page_size must be positive"));
        }
        if self.view.page_size_options.iter().any(|&size| size == 0) {
            return Err(anyhow!("view.page_size_options must only contain positive sizes"));
        }
        if self.view.default_limit == 0 {
            return Err(anyhow!("view.default_limit must be positive"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must not be empty"));
        }
        if self.symbols.iter().any(|s| s.trim().is_empty() || *s != s.to_lowercase()) {
            return Err(anyhow!("symbols must be non-empty lowercase identifiers"));
        }
        Ok(())
    }
}
