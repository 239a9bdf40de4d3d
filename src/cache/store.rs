//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration and dependency bookkeeping.
//!
//! The store is clock-agnostic: every time-sensitive call takes `now` in Unix
//! milliseconds, and it emits no events. The manager wraps it with both.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::cache::{
    CacheItem, CacheStats, CascadeMode, DependencyGraph, LruTracker, SetOptions,
};
use crate::config::CacheConfig;

// == Lookup ==
/// Outcome of a read against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Present and fresh
    Hit(T),
    /// Never stored, or already removed
    Miss,
    /// Was present but stale; it has now been removed
    Expired,
}

impl<T> Lookup<T> {
    #[cfg(test)]
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

// == Set Outcome ==
/// What a `set` did besides storing the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOutcome {
    /// Key evicted to make room, if any
    pub evicted: Option<String>,
    /// Whether an existing entry was overwritten
    pub replaced: bool,
}

// == Cache Store ==
/// Main cache storage with LRU eviction, TTL support and dependency tracking.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheItem<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Dependency edges between keys
    graph: DependencyGraph,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: u64,
    enable_versioning: bool,
    enable_dependency_tracking: bool,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            graph: DependencyGraph::new(),
            stats: CacheStats::new(),
            max_size: config.max_size.max(1),
            default_ttl_ms: duration_ms(config.default_ttl),
            enable_versioning: config.enable_versioning,
            enable_dependency_tracking: config.enable_dependency_tracking,
        }
    }

    // == Set ==
    /// Stores a value, unconditionally overwriting any existing entry.
    ///
    /// If the key is new and the store is at capacity, exactly one least
    /// recently used entry is evicted first.
    pub fn set(&mut self, key: &str, value: V, options: &SetOptions, now: u64) -> SetOutcome {
        let replaced = self.entries.contains_key(key);

        let mut evicted = None;
        if !replaced && self.entries.len() >= self.max_size {
            if let Some(victim) = self.lru.evict_oldest() {
                self.remove_entry(&victim);
                self.stats.record_eviction();
                evicted = Some(victim);
            }
        }

        let ttl = options.ttl.map(duration_ms).unwrap_or(self.default_ttl_ms);
        let version = options
            .version
            .unwrap_or(if self.enable_versioning { now } else { 1 });
        let dependencies: BTreeSet<String> = options
            .dependencies
            .iter()
            .filter(|dep| dep.as_str() != key)
            .cloned()
            .collect();

        // Overwrite replaces the key's own edges; keys depending on it keep theirs.
        self.graph.remove_outgoing(key);
        if self.enable_dependency_tracking {
            for depends_on in &dependencies {
                self.graph.add_dependency(key, depends_on);
            }
        }

        let item = CacheItem::new(value, now, ttl, version, dependencies);
        self.entries.insert(key.to_string(), item);
        self.lru.touch(key);

        self.stats.record_set();
        self.stats.set_size(self.entries.len());

        SetOutcome { evicted, replaced }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A fresh hit refreshes the entry's timestamp. A stale entry is removed
    /// and reported as [`Lookup::Expired`]; both that and absence count as misses.
    pub fn get(&mut self, key: &str, now: u64) -> Lookup<V> {
        match self.entries.get_mut(key) {
            None => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
            Some(item) if !item.is_expired(now) => {
                item.touch(now);
                let value = item.data.clone();
                self.lru.touch(key);
                self.stats.record_hit();
                return Lookup::Hit(value);
            }
            Some(_) => {}
        }

        self.expire_entry(key);
        self.stats.record_miss();
        Lookup::Expired
    }

    // == Has ==
    /// Reports presence without touching recency or hit/miss counters.
    ///
    /// A stale entry is still removed as a side effect.
    pub fn has(&mut self, key: &str, now: u64) -> Lookup<()> {
        match self.entries.get(key) {
            None => Lookup::Miss,
            Some(item) if item.is_expired(now) => {
                self.expire_entry(key);
                Lookup::Expired
            }
            Some(_) => Lookup::Hit(()),
        }
    }

    // == Delete ==
    /// Removes an entry and its dependency edges. Does not cascade.
    ///
    /// Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.stats.record_delete();
        }
        removed
    }

    // == Invalidate ==
    /// Removes `key` and, depending on `cascade`, the keys derived from it.
    ///
    /// Dependents are read before `key` is removed, since removal drops its
    /// edges. Returns the removed keys in removal order.
    pub fn invalidate(&mut self, key: &str, cascade: CascadeMode) -> Vec<String> {
        let mut removed = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([key.to_string()]);
        visited.insert(key.to_string());

        while let Some(current) = queue.pop_front() {
            let fan_out = match cascade {
                CascadeMode::None => false,
                CascadeMode::Direct => current == key,
                CascadeMode::Transitive => true,
            };
            let dependents = if fan_out {
                self.graph.dependents(&current)
            } else {
                BTreeSet::new()
            };

            if self.remove_entry(&current).is_some() {
                self.stats.record_invalidation();
                removed.push(current);
            }

            for dependent in dependents {
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }

        removed
    }

    // == Invalidate Prefix ==
    /// Invalidates every stored key that starts with `prefix`.
    ///
    /// Returns one `(root, removed)` pair per matching key that still removed
    /// something; roots already swept up by an earlier cascade are skipped.
    pub fn invalidate_prefix(
        &mut self,
        prefix: &str,
        cascade: CascadeMode,
    ) -> Vec<(String, Vec<String>)> {
        let mut roots: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        roots.sort();

        roots
            .into_iter()
            .filter_map(|root| {
                let removed = self.invalidate(&root, cascade);
                (!removed.is_empty()).then_some((root, removed))
            })
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all stale entries. Returns their keys.
    pub fn cleanup(&mut self, now: u64) -> Vec<String> {
        let mut expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, item)| item.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();

        for key in &expired {
            self.expire_entry(key);
        }
        expired
    }

    // == Clear ==
    /// Removes every entry and edge. Counters other than `size` are kept.
    ///
    /// Returns the number of entries dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.graph.clear();
        self.stats.set_size(0);
        count
    }

    // == Versions ==
    pub fn get_version(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|item| item.version)
    }

    /// Overwrites the version field only. Returns false if the key is absent.
    pub fn update_version(&mut self, key: &str, version: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(item) => {
                item.version = version;
                true
            }
            None => false,
        }
    }

    // == Keys ==
    /// Sorted keys of entries that are fresh at `now`.
    pub fn keys(&self, now: u64) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, item)| !item.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Read-only view of an entry, stale or not.
    pub fn peek(&self, key: &str) -> Option<&CacheItem<V>> {
        self.entries.get(key)
    }

    pub fn dependents(&self, key: &str) -> BTreeSet<String> {
        self.graph.dependents(key)
    }

    pub fn dependencies(&self, key: &str) -> BTreeSet<String> {
        self.graph.dependencies(key)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
        self.stats.set_size(self.entries.len());
    }

    // == Length ==
    /// Returns the number of entries held, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expire_entry(&mut self, key: &str) {
        if self.remove_entry(key).is_some() {
            self.stats.record_expiration();
        }
    }

    /// Single removal path: entry, recency slot and every dependency edge.
    fn remove_entry(&mut self, key: &str) -> Option<CacheItem<V>> {
        let item = self.entries.remove(key)?;
        self.lru.remove(key);
        self.graph.remove_dependencies(key);
        self.stats.set_size(self.entries.len());
        Some(item)
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
