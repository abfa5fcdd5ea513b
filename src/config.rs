use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Hard weekly cap on refresh spend, in USD.
    #[serde(default = "default_weekly_budget")]
    pub weekly_budget_usd: f64,

    /// Flat per-platform refresh rate used for job cost estimates.
    #[serde(default = "default_cost_per_platform")]
    pub cost_per_platform_usd: f64,

    /// Pause between successive job submissions in one pass.
    #[serde(default = "default_submit_throttle_ms")]
    pub submit_throttle_ms: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("podpulse");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("podpulse.db").to_string_lossy().to_string()
}

fn default_weekly_budget() -> f64 {
    25.0
}

fn default_cost_per_platform() -> f64 {
    0.5
}

fn default_submit_throttle_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            weekly_budget_usd: default_weekly_budget(),
            cost_per_platform_usd: default_cost_per_platform(),
            submit_throttle_ms: default_submit_throttle_ms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podpulse")
            .join("config.toml")
    }
}
