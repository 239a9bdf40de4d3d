//! Cache Entry Module
//!
//! Defines the structure for individual cache items with TTL and version metadata.

use std::collections::BTreeSet;

// == Cache Item ==
/// Represents a single cached value with its freshness metadata.
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    /// The stored value, never inspected by the cache
    pub data: V,
    /// Last write or read time (Unix milliseconds)
    pub timestamp: u64,
    /// Time-to-live in milliseconds, relative to `timestamp`
    pub ttl: u64,
    /// Caller-visible version number
    pub version: u64,
    /// Keys this value was derived from at write time
    pub dependencies: BTreeSet<String>,
}

impl<V> CacheItem<V> {
    // == Constructor ==
    /// Creates a new item written at `now`.
    pub fn new(
        data: V,
        now: u64,
        ttl: u64,
        version: u64,
        dependencies: BTreeSet<String>,
    ) -> Self {
        Self {
            data,
            timestamp: now,
            ttl,
            version,
            dependencies,
        }
    }

    // == Is Expired ==
    /// Checks if the item is stale at `now`.
    ///
    /// Boundary condition: an item is stale once `now >= timestamp + ttl`, so a
    /// zero TTL is stale immediately. Re-derived on every call; nothing is cached.
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) >= self.ttl
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at `now`, `0` once stale.
    #[cfg(test)]
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.timestamp
            .saturating_add(self.ttl)
            .saturating_sub(now)
    }

    // == Touch ==
    /// Refreshes the recency timestamp.
    pub fn touch(&mut self, now: u64) {
        self.timestamp = now;
    }
}
