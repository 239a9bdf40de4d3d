//! Configuration Module
//!
//! Handles loading and validating cache configuration.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache manager configuration parameters.
///
/// Immutable once handed to a [`crate::CacheManager`]. All values can be
/// configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied to entries set without an explicit TTL
    pub default_ttl: Duration,
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Stamp new entries with the write time as their version
    pub enable_versioning: bool,
    /// Record dependency edges declared on `set`
    pub enable_dependency_tracking: bool,
    /// Rate-limit events per (type, key)
    pub enable_event_throttling: bool,
    /// Cooldown between two deliveries of the same (type, key) event
    pub throttle_window: Duration,
    /// Period of the background expiry sweep
    pub cleanup_interval: Duration,
    /// Capacity of the broadcast event stream
    pub event_buffer: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_ENABLE_VERSIONING` - Version entries by write time (default: true)
    /// - `CACHE_ENABLE_DEPENDENCY_TRACKING` - Track dependencies (default: true)
    /// - `CACHE_ENABLE_EVENT_THROTTLING` - Throttle events (default: true)
    /// - `CACHE_THROTTLE_WINDOW_MS` - Throttle window in milliseconds (default: 100)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep period in milliseconds (default: 60000)
    /// - `CACHE_EVENT_BUFFER` - Broadcast stream capacity (default: 256)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_millis("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl),
            max_size: env_parse("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            enable_versioning: env_flag("CACHE_ENABLE_VERSIONING")
                .unwrap_or(defaults.enable_versioning),
            enable_dependency_tracking: env_flag("CACHE_ENABLE_DEPENDENCY_TRACKING")
                .unwrap_or(defaults.enable_dependency_tracking),
            enable_event_throttling: env_flag("CACHE_ENABLE_EVENT_THROTTLING")
                .unwrap_or(defaults.enable_event_throttling),
            throttle_window: env_millis("CACHE_THROTTLE_WINDOW_MS")
                .unwrap_or(defaults.throttle_window),
            cleanup_interval: env_millis("CACHE_CLEANUP_INTERVAL_MS")
                .unwrap_or(defaults.cleanup_interval),
            event_buffer: env_parse("CACHE_EVENT_BUFFER").unwrap_or(defaults.event_buffer),
        }
    }

    /// Rejects configurations the cache cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be non-zero".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(CacheError::InvalidConfig(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a copy with event throttling turned off.
    pub fn without_throttling(mut self) -> Self {
        self.enable_event_throttling = false;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_size: 1000,
            enable_versioning: true,
            enable_dependency_tracking: true,
            enable_event_throttling: true,
            throttle_window: Duration::from_millis(100),
            cleanup_interval: Duration::from_secs(60),
            event_buffer: 256,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

fn env_flag(name: &str) -> Option<bool> {
    match env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
