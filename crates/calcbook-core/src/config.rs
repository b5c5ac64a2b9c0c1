//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-call execution switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Serve referenced calculations from the cache when an entry exists.
    pub use_cache: bool,
    /// Record a history entry for the top-level calculation.
    pub save_history: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        ExecuteOptions {
            use_cache: true,
            save_history: true,
        }
    }
}

impl ExecuteOptions {
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn without_history(mut self) -> Self {
        self.save_history = false;
        self
    }
}

/// Engine-wide settings, read from the `[engine]` table of a book file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on one alternate-runtime execution.
    pub runtime_timeout_ms: u64,
    /// Fail a call that re-enters a calculation already being resolved.
    pub detect_cycles: bool,
    /// Register the built-in helper library at init.
    pub core_functions: bool,
    pub use_cache: bool,
    pub save_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            runtime_timeout_ms: 5000,
            detect_cycles: true,
            core_functions: true,
            use_cache: true,
            save_history: true,
        }
    }
}

impl EngineConfig {
    pub fn runtime_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime_timeout_ms)
    }

    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            use_cache: self.use_cache,
            save_history: self.save_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config: EngineConfig = toml::from_str("runtime_timeout_ms = 250").unwrap();
        assert_eq!(config.runtime_timeout(), Duration::from_millis(250));
        assert!(config.detect_cycles);
        assert_eq!(config.execute_options(), ExecuteOptions::default());
    }
}
