//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
///
/// `server` and `proxy` are required; they are `Option` so that a missing
/// section is reported by validation instead of a generic parse error.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen address and port.
    pub server: Option<ServerConfig>,

    /// Domain → backend URL mapping (the `[proxy]` section), in file order.
    pub proxy: Option<toml::Table>,

    /// Backend timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Route pairs in the order they are fed to the routing table builder.
    ///
    /// Entries whose value is not a string are skipped; validation reports them.
    pub fn route_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.proxy
            .iter()
            .flatten()
            .filter_map(|(domain, url)| url.as_str().map(|url| (domain.as_str(), url)))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to listen on. Empty means all interfaces.
    #[serde(default)]
    pub address: String,

    /// TCP port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        let address = self.address.trim();
        if address.is_empty() {
            format!("0.0.0.0:{}", self.port)
        } else if address.contains(':') && !address.starts_with('[') {
            format!("[{}]:{}", address, self.port)
        } else {
            format!("{}:{}", address, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
        }
    }
}

/// Timeouts applied when talking to backends.
///
/// Unset values mean no deadline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Deadline for the backend to produce response headers, in seconds.
    pub upstream_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
