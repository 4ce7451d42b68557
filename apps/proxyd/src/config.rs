//! Daemon configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Daemon configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Downstream bind address (`host:port`).
    /// Override: `ARIA_LISTEN`
    pub listen: String,

    /// Upstream controller address (`host:port`).
    /// Override: `ARIA_CONNECT`
    pub connect: String,

    /// Per-exchange timeout in milliseconds.
    /// Override: `ARIA_TIMEOUT_MS`
    pub timeout_ms: u64,

    /// Capacity of the typed-event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let core = aria_core::ProxyConfig::default();
        Self {
            listen: core.listen,
            connect: core.connect,
            timeout_ms: core.timeout_ms,
            event_channel_capacity: core.event_channel_capacity,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ARIA_LISTEN") {
            if !val.is_empty() {
                self.listen = val;
            }
        }

        if let Ok(val) = std::env::var("ARIA_CONNECT") {
            if !val.is_empty() {
                self.connect = val;
            }
        }

        if let Ok(val) = std::env::var("ARIA_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.timeout_ms = timeout;
            }
        }
    }

    /// Converts to aria-core's config type.
    pub fn to_core_config(&self) -> aria_core::ProxyConfig {
        aria_core::ProxyConfig {
            listen: self.listen.clone(),
            connect: self.connect.clone(),
            timeout_ms: self.timeout_ms,
            event_channel_capacity: self.event_channel_capacity,
        }
    }
}
