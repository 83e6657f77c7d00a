//! Configuration loading and validation

use crate::cache::{CacheConfig, DEFAULT_CAPACITY};
use crate::error::{AuthzError, Result};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the collection cache TTL (milliseconds)
pub const ENV_DATA_CACHE_MAX_AGE: &str = "DATA_CACHE_MAX_AGE";

/// Environment variable overriding the per-cache capacity
pub const ENV_DATA_CACHE_CAPACITY: &str = "DATA_CACHE_CAPACITY";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthzConfig {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSection {
    /// TTL of the group, application and connection lists
    #[serde(default = "default_data_cache_max_age_ms")]
    pub data_cache_max_age_ms: u64,

    /// Keys per cache before LRU eviction
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// TTL of single-connection lookups
    #[serde(default = "default_connection_max_age_ms")]
    pub connection_max_age_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            data_cache_max_age_ms: default_data_cache_max_age_ms(),
            capacity: default_capacity(),
            connection_max_age_ms: default_connection_max_age_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_data_cache_max_age_ms() -> u64 {
    60_000
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_connection_max_age_ms() -> u64 {
    600_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AuthzConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthzError::Io(format!("{}: {}", path.display(), e)))?;

        let config: AuthzConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply `DATA_CACHE_MAX_AGE` and `DATA_CACHE_CAPACITY` overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DATA_CACHE_MAX_AGE) {
            self.cache.data_cache_max_age_ms = parse_env(ENV_DATA_CACHE_MAX_AGE, &value)?;
        }

        if let Some(value) = lookup(ENV_DATA_CACHE_CAPACITY) {
            self.cache.capacity = parse_env(ENV_DATA_CACHE_CAPACITY, &value)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.data_cache_max_age_ms == 0 {
            return Err(AuthzError::InvalidConfig(
                "cache.data_cache_max_age_ms must be greater than zero".to_string(),
            ));
        }

        if self.cache.connection_max_age_ms == 0 {
            return Err(AuthzError::InvalidConfig(
                "cache.connection_max_age_ms must be greater than zero".to_string(),
            ));
        }

        if self.cache.capacity == 0 {
            return Err(AuthzError::InvalidConfig(
                "cache.capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings for the group, application and connection list caches
    pub fn data_cache(&self) -> CacheConfig {
        CacheConfig::new(
            self.cache.capacity,
            Duration::from_millis(self.cache.data_cache_max_age_ms),
        )
    }

    /// Settings for the single-connection lookup cache
    pub fn connection_cache(&self) -> CacheConfig {
        CacheConfig::new(
            self.cache.capacity,
            Duration::from_millis(self.cache.connection_max_age_ms),
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AuthzError::InvalidConfig(format!("{} has invalid value '{}'", name, value)))
}
