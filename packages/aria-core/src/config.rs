//! Core runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the proxy core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Downstream bind address (`host:port`).
    pub listen: String,

    /// Upstream controller address (`host:port`).
    pub connect: String,

    /// Per-exchange timeout in milliseconds.
    pub timeout_ms: u64,

    /// Capacity of the typed-event broadcast channel.
    pub event_channel_capacity: usize,
}

impl ProxyConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.is_empty() {
            return Err("listen address must not be empty".to_string());
        }
        if self.connect.is_empty() {
            return Err("connect address must not be empty".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// The per-exchange timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:2323".to_string(),
            connect: "192.168.1.48:23".to_string(),
            timeout_ms: 5000,
            event_channel_capacity: 100,
        }
    }
}
