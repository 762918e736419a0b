//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (`TRIPLECORE_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [cache]
//! subtree_cache_capacity = 50
//!
//! [limits]
//! max_result_size = 1000000
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! TRIPLECORE_CACHE__SUBTREE_CACHE_CAPACITY=100
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: ResourceLimitsConfig,
    #[serde(default)]
    pub runtime_parameters: RuntimeParameters,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subtree cache configuration. Capacity is exposed here rather than
/// compiled in, per spec.md §9's resolution of the "cache capacity is a
/// compile-time constant" open question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub subtree_cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    50
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            subtree_cache_capacity: default_cache_capacity(),
        }
    }
}

/// Cooperative resource limits enforced during execution.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceLimitsConfig {
    pub max_memory_bytes: Option<usize>,
    pub max_result_size: Option<usize>,
    pub max_intermediate_size: Option<usize>,
    pub max_row_width: Option<usize>,
}

/// The benchmark CLI's recognized runtime tunables (spec.md §6). None of
/// these feed an operator in this core (there is no GROUP BY operator in
/// the catalog) — they are accepted, validated, and threaded through
/// configuration only, matching the spec's description of them as
/// "recognized keys", not executable behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeParameters {
    #[serde(default = "default_sample_percent")]
    pub group_by_sample_percent: f64,
    #[serde(default = "default_sample_max_rows")]
    pub group_by_sample_max_rows: usize,
    #[serde(default = "default_sample_distinct_ratio")]
    pub group_by_sample_distinct_ratio: f64,
    #[serde(default = "default_sample_group_threshold")]
    pub group_by_sample_group_threshold: usize,
    #[serde(default = "default_hash_map_group_threshold")]
    pub group_by_hash_map_group_threshold: usize,
}

fn default_sample_percent() -> f64 {
    0.01
}
fn default_sample_max_rows() -> usize {
    100_000
}
fn default_sample_distinct_ratio() -> f64 {
    0.9
}
fn default_sample_group_threshold() -> usize {
    1_000_000
}
fn default_hash_map_group_threshold() -> usize {
    100_000
}

impl Default for RuntimeParameters {
    fn default() -> Self {
        RuntimeParameters {
            group_by_sample_percent: default_sample_percent(),
            group_by_sample_max_rows: default_sample_max_rows(),
            group_by_sample_distinct_ratio: default_sample_distinct_ratio(),
            group_by_sample_group_threshold: default_sample_group_threshold(),
            group_by_hash_map_group_threshold: default_hash_map_group_threshold(),
        }
    }
}

impl RuntimeParameters {
    /// Merge a single recognized key=value pair (as parsed from a CLI flag
    /// or configuration-shorthand string). Returns an error for an
    /// unrecognized key or a value that doesn't parse for its type.
    pub fn set_by_key(&mut self, key: &str, value: &str) -> Result<(), crate::EngineError> {
        let parse_f64 = |v: &str| {
            v.parse::<f64>()
                .map_err(|e| crate::EngineError::UsageError(format!("invalid float for {key}: {e}")))
        };
        let parse_usize = |v: &str| {
            v.parse::<usize>()
                .map_err(|e| crate::EngineError::UsageError(format!("invalid integer for {key}: {e}")))
        };
        match key {
            "group-by-sample-percent" => self.group_by_sample_percent = parse_f64(value)?,
            "group-by-sample-max-rows" => self.group_by_sample_max_rows = parse_usize(value)?,
            "group-by-sample-distinct-ratio" => {
                self.group_by_sample_distinct_ratio = parse_f64(value)?
            }
            "group-by-sample-group-threshold" => {
                self.group_by_sample_group_threshold = parse_usize(value)?
            }
            "group-by-hash-map-group-threshold" => {
                self.group_by_hash_map_group_threshold = parse_usize(value)?
            }
            other => {
                return Err(crate::EngineError::UsageError(format!(
                    "unrecognized configuration key: {other}"
                )))
            }
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (`TRIPLECORE_*` prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("TRIPLECORE_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRIPLECORE_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache: CacheConfig::default(),
            limits: ResourceLimitsConfig::default(),
            runtime_parameters: RuntimeParameters::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_qlever_cache_capacity() {
        let config = Config::default();
        assert_eq!(config.cache.subtree_cache_capacity, 50);
    }

    #[test]
    fn runtime_parameters_set_by_key() {
        let mut rp = RuntimeParameters::default();
        rp.set_by_key("group-by-sample-percent", "0.5").unwrap();
        assert_eq!(rp.group_by_sample_percent, 0.5);
        assert!(rp.set_by_key("not-a-real-key", "1").is_err());
        assert!(rp.set_by_key("group-by-sample-percent", "oops").is_err());
    }

    #[test]
    fn config_serialization_round_trips() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[runtime_parameters]"));
    }
}
