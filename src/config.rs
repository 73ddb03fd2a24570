use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::endpoint::{EndpointCache, DEFAULT_TTL_SECS};

/// Process-wide configuration instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collector daemon address as "host:port"
    pub daemon_address: String,
    /// Seconds a resolved daemon address stays fresh
    #[serde(default = "default_ttl_secs")]
    pub endpoint_ttl_secs: u64,
    /// Whether interceptors record raw statement text
    #[serde(default)]
    pub collect_sql_queries: bool,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_address: "127.0.0.1:2000".to_string(),
            endpoint_ttl_secs: DEFAULT_TTL_SECS,
            collect_sql_queries: false,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        // Validate required fields
        parse_daemon_address(&config.daemon_address)?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Build the endpoint cache for the configured daemon address
    pub fn daemon_endpoint(&self) -> Result<EndpointCache> {
        let (host, port) = parse_daemon_address(&self.daemon_address)?;
        Ok(EndpointCache::with_ttl(host, port, self.endpoint_ttl_secs))
    }
}

/// Split a "host:port" daemon address into its parts
pub fn parse_daemon_address(address: &str) -> Result<(String, i32)> {
    let (host, port) = address
        .rsplit_once(':')
        .with_context(|| format!("Daemon address '{}' is missing a port", address))?;

    if host.is_empty() {
        return Err(anyhow::anyhow!("Daemon address '{}' is missing a host", address));
    }

    let port: i32 = port
        .trim()
        .parse()
        .with_context(|| format!("Daemon address '{}' has a malformed port", address))?;

    Ok((host.to_string(), port))
}

/// Get a copy of the current global configuration
pub fn get_config() -> Config {
    CONFIG.read().clone()
}

/// Replace the global configuration
pub fn set_config(config: Config) {
    *CONFIG.write() = config;
}
