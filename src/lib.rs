//! Cache Consistency - a dependency-aware in-memory cache
//!
//! Keeps derived values fresh with TTL expiration and LRU eviction,
//! invalidates them when an upstream key changes, and announces every
//! change through a throttled event channel.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod manager;
pub mod memo;
pub mod tasks;

mod sync;

pub use cache::{CacheStats, CascadeMode, InvalidateOptions, RemoveOptions, SetOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, CacheEventKind, ListenerId};
pub use manager::{CacheManager, WeakCacheManager};
pub use memo::memoized;
pub use tasks::spawn_cleanup_task;
