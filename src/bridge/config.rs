//! Bridge configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "limits": {
//!     "max_calls_per_cycle": 4,
//!     "cache_ttl_seconds": 300,
//!     "max_latency_ms": 250,
//!     "max_cache_entries": 64
//!   },
//!   "determinism": { "seed": 42, "fixed_timestamps": true, "noise_mode": "none" }
//! }
//! ```
//!
//! Every field is optional. A zero limit means "no limit", except
//! `cache_ttl_seconds` where zero disables the cache.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 64;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_NOISE_MODE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Engine calls allowed per cycle. `0` = unlimited.
    pub max_calls_per_cycle: u32,
    /// Cache entry lifetime. `0` disables caching.
    pub cache_ttl_seconds: u64,
    /// Latency above which a completed call is flagged. `0` = never.
    pub max_latency_ms: u64,
    pub max_cache_entries: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_calls_per_cycle: 0,
            cache_ttl_seconds: 0,
            max_latency_ms: 0,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
        }
    }
}

/// Knobs handed to the engine. Part of every cache key, so changing any of
/// them never serves a stale measurement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DeterminismConfig {
    pub seed: u64,
    pub fixed_timestamps: bool,
    pub noise_mode: String,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            fixed_timestamps: true,
            noise_mode: DEFAULT_NOISE_MODE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub limits: LimitsConfig,
    pub determinism: DeterminismConfig,
}

impl BridgeConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_cache_entries == 0 {
            return Err(Error::Config("limits.max_cache_entries must be at least 1".into()));
        }
        if self.determinism.noise_mode.trim().is_empty() {
            return Err(Error::Config("determinism.noise_mode must not be empty".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.limits.cache_ttl_seconds)
    }

    pub fn max_latency(&self) -> Option<Duration> {
        match self.limits.max_latency_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_all_defaults() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.limits.max_cache_entries, 64);
        assert_eq!(config.determinism.seed, 42);
        assert!(config.determinism.fixed_timestamps);
        assert_eq!(config.determinism.noise_mode, "none");
        assert_eq!(config.cache_ttl(), Duration::ZERO);
        assert_eq!(config.max_latency(), None);
    }

    #[test]
    fn partial_blocks_keep_other_defaults() {
        let config = BridgeConfig::from_json_str(
            r#"{"limits": {"cache_ttl_seconds": 30}, "determinism": {"seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.limits.cache_ttl_seconds, 30);
        assert_eq!(config.limits.max_cache_entries, 64);
        assert_eq!(config.determinism.seed, 7);
        assert_eq!(config.determinism.noise_mode, "none");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"limits": {"max_cache_entries": 0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"limits": {"max_calls_per_cycle": -1}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            BridgeConfig::from_path("/nonexistent/bridge-config.json"),
            Err(Error::Io(_))
        ));
    }
}
