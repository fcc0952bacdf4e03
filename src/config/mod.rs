pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

pub use types::Config;

impl Config {
    /// Reads a TOML config file, falling back to defaults when it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        anyhow::ensure!(
            (1..=100).contains(&config.polling.per_page),
            "polling.per_page must be between 1 and 100, got {}",
            config.polling.per_page
        );
        Ok(config)
    }
}
