//! # Configuration File
//!
//! ```toml
//! [store.registry]
//! timeout_ms = 30000
//!
//! [store.registry.hosts."localhost:5000"]
//! plain_http = true
//!
//! [runtime]
//! timeout_ms = 1000
//! input = "argument"
//! max_memory_bytes = 268435456
//! ```
//!
//! Every section and key is optional; missing ones take their defaults.

use std::path::Path;

use genrun::RuntimeConfig;
use genstore::StoreConfig;
use serde::Deserialize;

use crate::error::Result;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
