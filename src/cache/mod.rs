//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction and
//! dependency tracking between keys.

mod dependency;
mod entry;
mod lru;
mod options;
mod stats;
mod store;


// Re-export public types
pub use dependency::DependencyGraph;
pub use entry::CacheItem;
pub use lru::LruTracker;
pub use options::{CascadeMode, InvalidateOptions, RemoveOptions, SetOptions};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup, SetOutcome};
