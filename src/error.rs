//! Error types for the cache manager
//!
//! Cache misses are not errors; this enum covers configuration and
//! integration failures only.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache manager.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key parameters could not be canonicalized
    #[error("Key serialization failed: {0}")]
    KeySerialization(#[from] serde_json::Error),

    /// Background sweeper requested outside a tokio runtime
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;
