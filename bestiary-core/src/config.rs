//! Configuration types

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Public catalog API root.
pub const DEFAULT_API_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Default per-request timeout (15 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Default cache entry lifetime (7 days).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default number of records preloaded by the dataset loader.
pub const DEFAULT_FETCH_LIMIT: usize = 251;

/// Default worker count for bulk detail fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default quiet period for search-as-you-type.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Durable cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Directory of the durable store.
    pub path: PathBuf,
    pub namespace: String,
    pub ttl_secs: u64,
    pub max_size_mb: usize,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Bulk detail fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSettings {
    pub limit: usize,
    pub concurrency: usize,
    pub continue_on_error: bool,
}

/// Search and listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub page_size: usize,
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Master configuration struct.
///
/// Every field is required in a config file; `Default` exists for embedding
/// the client as a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BestiaryConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub cache: CacheSettings,
    pub fetch: FetchSettings,
    pub search: SearchSettings,
}

impl Default for BestiaryConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache: CacheSettings {
                path: std::env::temp_dir().join("bestiary").join("cache"),
                namespace: "poke".to_string(),
                ttl_secs: DEFAULT_CACHE_TTL_SECS,
                max_size_mb: 64,
            },
            fetch: FetchSettings {
                limit: DEFAULT_FETCH_LIMIT,
                concurrency: DEFAULT_CONCURRENCY,
                continue_on_error: true,
            },
            search: SearchSettings {
                debounce_ms: DEFAULT_DEBOUNCE_MS,
                page_size: 24,
            },
        }
    }
}

impl BestiaryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_base_url".to_string(),
            });
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "api_base_url",
                &self.api_base_url,
                "must be an http(s) URL",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_ms",
                self.request_timeout_ms,
                "must be > 0",
            ));
        }
        if self.cache.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache.path".to_string(),
            });
        }
        if self.cache.namespace.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache.namespace".to_string(),
            });
        }
        if self.cache.namespace.contains(':') {
            return Err(ConfigError::invalid(
                "cache.namespace",
                &self.cache.namespace,
                "must not contain ':'",
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::invalid("cache.ttl_secs", 0, "must be > 0"));
        }
        if self.cache.max_size_mb == 0 {
            return Err(ConfigError::invalid("cache.max_size_mb", 0, "must be > 0"));
        }
        if self.fetch.limit == 0 {
            return Err(ConfigError::invalid("fetch.limit", 0, "must be > 0"));
        }
        if self.fetch.concurrency == 0 {
            return Err(ConfigError::invalid("fetch.concurrency", 0, "must be > 0"));
        }
        if self.search.page_size == 0 {
            return Err(ConfigError::invalid("search.page_size", 0, "must be > 0"));
        }
        Ok(())
    }
}
