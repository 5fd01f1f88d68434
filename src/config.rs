use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::source::NetworkProperties;

fn default_list_size() -> u32 {
    100
}

fn default_poll_interval_secs() -> u64 {
    6
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ss58_format() -> u16 {
    42
}

fn default_token_decimals() -> u8 {
    12
}

/// An explorer API endpoint for one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub api_url: String,
    #[serde(default)]
    pub spec_name: Option<String>,
    #[serde(default = "default_ss58_format")]
    pub ss58_format: u16,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
}

impl NetworkConfig {
    pub fn properties(&self) -> NetworkProperties {
        NetworkProperties {
            name: self.name.clone(),
            ss58_format: self.ss58_format,
            token_symbol: self.token_symbol.clone(),
            token_decimals: self.token_decimals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub default_network: Option<String>,
    /// Items requested per list page
    #[serde(default = "default_list_size")]
    pub list_size: u32,
    /// Seconds between polls for new items
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_network: None,
            list_size: default_list_size(),
            poll_interval_secs: default_poll_interval_secs(),
            log_level: default_log_level(),
            networks: Vec::new(),
        }
    }
}

impl Config {
    /// Returns the config directory path (~/.config/subex on Linux)
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("subex"))
            .context("Could not determine config directory")
    }

    /// Returns the config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {path:?}"))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {dir:?}"))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {path:?}"))?;

        Ok(())
    }

    /// Remember the selected network and persist
    pub fn set_default_network(&mut self, name: &str) -> Result<()> {
        self.default_network = Some(name.to_string());
        self.save()
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Network to select on startup: the remembered one if still configured,
    /// otherwise the first configured network.
    pub fn initial_network(&self) -> Option<&NetworkConfig> {
        self.default_network
            .as_deref()
            .and_then(|name| self.network(name))
            .or_else(|| self.networks.first())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_network = "kusama"
list_size = 50

[[networks]]
name = "polkadot"
api_url = "https://explorer.example/polkadot/graphql"
spec_name = "polkadot"
ss58_format = 0
token_symbol = "DOT"
token_decimals = 10

[[networks]]
name = "kusama"
api_url = "https://explorer.example/kusama/graphql"
ss58_format = 2
token_symbol = "KSM"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.list_size, 50);
        assert_eq!(config.poll_interval_secs, 6);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.networks.len(), 2);

        let kusama = config.network("kusama").unwrap();
        assert_eq!(kusama.spec_name, None);
        assert_eq!(kusama.token_decimals, 12);
        assert_eq!(kusama.properties().token_symbol, "KSM");
    }

    #[test]
    fn test_initial_network() {
        let mut config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.initial_network().unwrap().name, "kusama");

        config.default_network = Some("westend".into());
        assert_eq!(config.initial_network().unwrap().name, "polkadot");

        assert!(Config::default().initial_network().is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }
}
