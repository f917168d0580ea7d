//! # Store Configuration
//!
//! Per-registry connection settings. Registries are reached over HTTPS unless
//! a host is explicitly listed with `plain_http = true`.
//!
//! ```toml
//! [registry]
//! timeout_ms = 30000
//!
//! [registry.hosts."localhost:5000"]
//! plain_http = true
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Connection settings for one registry host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Talk plain HTTP instead of HTTPS.
    pub plain_http: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Settings for hosts not listed in `hosts`.
    pub default: RegistrySettings,
    /// Keyed by `host:port` or bare `host`.
    pub hosts: HashMap<String, RegistrySettings>,
    /// Whole-request timeout for registry calls. No timeout when unset.
    pub timeout_ms: Option<u64>,
}

impl RegistryConfig {
    /// Settings for a registry, looked up by `host:port`, then `host`, then
    /// the default.
    pub fn settings_for(&self, host: &str, port: Option<u16>) -> RegistrySettings {
        port.and_then(|port| self.hosts.get(&format!("{}:{}", host, port)))
            .or_else(|| self.hosts.get(host))
            .copied()
            .unwrap_or(self.default)
    }

    /// Allows plain HTTP for `authority` (`host` or `host:port`).
    pub fn allow_plain_http(mut self, authority: impl Into<String>) -> Self {
        self.hosts
            .insert(authority.into(), RegistrySettings { plain_http: true });
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub registry: RegistryConfig,
}
