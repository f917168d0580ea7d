//! Runtime configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where a generator finds its input payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Copied into guest memory and passed as `generate(ptr, len)`.
    #[default]
    Argument,
    /// Mounted read-only at `/dawg/input`; the guest calls `generate()`.
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Default deadline for a single execution.
    pub timeout_ms: u64,
    pub input: InputMode,
    /// Upper bound on a guest's linear memory.
    pub max_memory_bytes: usize,
    /// Keep compiled modules between executions.
    pub cache_modules: bool,
    /// Compiled modules kept before the cache is flushed.
    pub module_cache_capacity: usize,
    /// Interval at which running guests are interrupted to check deadlines.
    pub epoch_tick_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1_000,
            input: InputMode::Argument,
            max_memory_bytes: 256 * 1024 * 1024,
            cache_modules: true,
            module_cache_capacity: 64,
            epoch_tick_ms: 10,
        }
    }
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn epoch_tick(&self) -> Duration {
        Duration::from_millis(self.epoch_tick_ms.max(1))
    }
}
