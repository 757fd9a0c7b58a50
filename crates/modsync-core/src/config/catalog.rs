//! Remote catalog API configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the resilient catalog client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (e.g. `https://api.example.com/`).
    pub base_url: String,
    /// API key sent with every request, if the catalog requires one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Header carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Per-attempt request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Attempts per logical call, first attempt included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Shared backoff applied after the first rate-limit signal.
    #[serde(default = "default_backoff_floor")]
    pub backoff_floor_ms: u64,
    /// Upper bound for the shared backoff.
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling_ms: u64,
    /// Lifetime of cached GET responses in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached responses.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,
}

impl CatalogConfig {
    /// Settings for `base_url` with every other field at its default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_key_header: default_api_key_header(),
            request_timeout_ms: default_request_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            backoff_floor_ms: default_backoff_floor(),
            backoff_ceiling_ms: default_backoff_ceiling(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
        }
    }

    /// Per-attempt request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// First retry delay.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Shared backoff floor.
    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    /// Shared backoff ceiling.
    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    250
}

fn default_backoff_floor() -> u64 {
    1_000
}

fn default_backoff_ceiling() -> u64 {
    60_000
}

fn default_cache_ttl() -> u64 {
    120
}

fn default_cache_max_entries() -> u64 {
    10_000
}
