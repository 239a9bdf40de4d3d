//! Cache Manager
//!
//! Façade composing the store, dependency graph, statistics and event channel
//! behind one configuration and one lifecycle.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{
    CacheStats, CacheStore, InvalidateOptions, Lookup, RemoveOptions, SetOptions,
};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::events::{
    CacheEvent, CacheEventKind, EventChannel, ListenerId, Topic, EVICTION_SOURCE, WILDCARD_KEY,
};
use crate::sync::lock;
use crate::tasks::spawn_cleanup_task;

struct Inner<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    /// Store, graph and stats share one lock so removals and edge cleanup
    /// are observed together.
    store: Mutex<CacheStore<V>>,
    events: EventChannel<V>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl<V> Drop for Inner<V> {
    fn drop(&mut self) {
        let sweeper = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = sweeper.take() {
            handle.abort();
        }
    }
}

// == Cache Manager ==
/// Dependency-aware TTL/LRU cache with change notifications.
///
/// Cloning yields another handle to the same cache. All operations are
/// synchronous; events are dispatched after the store lock is released, so
/// listeners may call back into the cache.
pub struct CacheManager<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.inner.config)
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle held by the background sweeper.
pub struct WeakCacheManager<V> {
    inner: Weak<Inner<V>>,
}

impl<V> WeakCacheManager<V> {
    pub fn upgrade(&self) -> Option<CacheManager<V>> {
        self.inner.upgrade().map(|inner| CacheManager { inner })
    }
}

impl<V> Clone for WeakCacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a manager on the system clock.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a manager on a caller-supplied clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let inner = Inner {
            store: Mutex::new(CacheStore::new(&config)),
            events: EventChannel::new(&config),
            sweeper: Mutex::new(None),
            destroyed: AtomicBool::new(false),
            config,
            clock,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakCacheManager<V> {
        WeakCacheManager {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    fn dispatch(&self, events: Vec<CacheEvent<V>>) {
        for event in events {
            self.inner.events.emit(event);
        }
    }

    // == Set ==
    /// Stores a value with the default TTL and no dependencies.
    pub fn set(&self, key: &str, value: V) {
        self.set_with(key, value, SetOptions::default());
    }

    /// Stores a value, overwriting any existing entry.
    pub fn set_with(&self, key: &str, value: V, options: SetOptions) {
        let now = self.now();
        let outcome = lock(&self.inner.store).set(key, value.clone(), &options, now);

        if outcome.replaced {
            debug!("Overwrote cached key '{}'", key);
        }
        let mut events = Vec::with_capacity(2);
        if let Some(victim) = outcome.evicted {
            debug!("Evicted least recently used key '{}'", victim);
            events.push(
                CacheEvent::new(CacheEventKind::Delete, victim, now)
                    .with_source(Some(EVICTION_SOURCE.to_string())),
            );
        }
        events.push(
            CacheEvent::new(CacheEventKind::Set, key, now)
                .with_data(value)
                .with_source(options.source),
        );
        self.dispatch(events);
    }

    // == Get ==
    /// Returns the value if present and fresh.
    ///
    /// A stale entry is removed and announced as `cache:expired`.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.now();
        let lookup = lock(&self.inner.store).get(key, now);

        match lookup {
            Lookup::Hit(value) => {
                self.dispatch(vec![
                    CacheEvent::new(CacheEventKind::Get, key, now).with_data(value.clone())
                ]);
                Some(value)
            }
            Lookup::Expired => {
                self.dispatch(vec![CacheEvent::new(CacheEventKind::Expired, key, now)]);
                None
            }
            Lookup::Miss => None,
        }
    }

    // == Has ==
    /// Checks presence without refreshing recency.
    pub fn has(&self, key: &str) -> bool {
        let now = self.now();
        let lookup = lock(&self.inner.store).has(key, now);

        match lookup {
            Lookup::Hit(()) => true,
            Lookup::Expired => {
                self.dispatch(vec![CacheEvent::new(CacheEventKind::Expired, key, now)]);
                false
            }
            Lookup::Miss => false,
        }
    }

    // == Delete ==
    /// Removes a single entry. Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.delete_with(key, RemoveOptions::default())
    }

    pub fn delete_with(&self, key: &str, options: RemoveOptions) -> bool {
        let now = self.now();
        let removed = lock(&self.inner.store).delete(key);
        if removed {
            self.dispatch(vec![
                CacheEvent::new(CacheEventKind::Delete, key, now).with_source(options.source)
            ]);
        }
        removed
    }

    // == Invalidate ==
    /// Invalidates `key` and its direct dependents.
    pub fn invalidate(&self, key: &str) -> bool {
        self.invalidate_with(key, InvalidateOptions::default())
    }

    /// Invalidates `key` with an explicit cascade mode.
    ///
    /// Emits a single `cache:invalidated` for `key` once the fan-out is done.
    pub fn invalidate_with(&self, key: &str, options: InvalidateOptions) -> bool {
        let now = self.now();
        let removed = lock(&self.inner.store).invalidate(key, options.cascade);
        if removed.is_empty() {
            return false;
        }

        debug!(
            "Invalidated '{}' ({:?} cascade): {} entries removed",
            key,
            options.cascade,
            removed.len()
        );
        self.dispatch(vec![
            CacheEvent::new(CacheEventKind::Invalidated, key, now).with_source(options.source)
        ]);
        true
    }

    /// Invalidates every key starting with `prefix`. Returns entries removed.
    pub fn invalidate_prefix(&self, prefix: &str, options: InvalidateOptions) -> usize {
        let now = self.now();
        let groups = lock(&self.inner.store).invalidate_prefix(prefix, options.cascade);

        let total = groups.iter().map(|(_, removed)| removed.len()).sum();
        let events = groups
            .into_iter()
            .map(|(root, _)| {
                CacheEvent::new(CacheEventKind::Invalidated, root, now)
                    .with_source(options.source.clone())
            })
            .collect();
        self.dispatch(events);

        if total > 0 {
            debug!("Invalidated prefix '{}': {} entries removed", prefix, total);
        }
        total
    }

    // == Clear ==
    /// Empties the cache. Hit/miss counters survive.
    pub fn clear(&self) -> usize {
        self.clear_with(RemoveOptions::default())
    }

    pub fn clear_with(&self, options: RemoveOptions) -> usize {
        let now = self.now();
        let count = lock(&self.inner.store).clear();
        info!("Cache cleared: {} entries removed", count);
        self.dispatch(vec![
            CacheEvent::new(CacheEventKind::Clear, WILDCARD_KEY, now).with_source(options.source)
        ]);
        count
    }

    // == Cleanup ==
    /// Removes every stale entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.now();
        let expired = lock(&self.inner.store).cleanup(now);
        self.inner.events.prune_throttle(now);

        let count = expired.len();
        let events = expired
            .into_iter()
            .map(|key| CacheEvent::new(CacheEventKind::Expired, key, now))
            .collect();
        self.dispatch(events);
        count
    }

    // == Versions ==
    pub fn get_version(&self, key: &str) -> Option<u64> {
        lock(&self.inner.store).get_version(key)
    }

    pub fn update_version(&self, key: &str, version: u64) -> bool {
        lock(&self.inner.store).update_version(key, version)
    }

    // == Introspection ==
    /// Sorted keys of fresh entries.
    pub fn keys(&self) -> Vec<String> {
        let now = self.now();
        lock(&self.inner.store).keys(now)
    }

    /// Number of entries held, including stale ones not yet swept.
    pub fn size(&self) -> usize {
        lock(&self.inner.store).len()
    }

    pub fn dependents(&self, key: &str) -> BTreeSet<String> {
        lock(&self.inner.store).dependents(key)
    }

    pub fn dependencies(&self, key: &str) -> BTreeSet<String> {
        lock(&self.inner.store).dependencies(key)
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.inner.store).stats()
    }

    pub fn reset_stats(&self) {
        lock(&self.inner.store).reset_stats();
    }

    // == Subscriptions ==
    /// Registers a listener for every event.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<V>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(Topic::All, Arc::new(listener))
    }

    /// Registers a listener for one event kind.
    pub fn subscribe_to<F>(&self, kind: CacheEventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<V>) + Send + Sync + 'static,
    {
        self.inner
            .events
            .subscribe(Topic::Kind(kind), Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Opens an async stream of delivered events.
    pub fn event_stream(&self) -> broadcast::Receiver<CacheEvent<V>> {
        self.inner.events.event_stream()
    }

    // == Lifecycle ==
    /// Starts the periodic expiry sweep on the current tokio runtime.
    ///
    /// Calling it again while a sweep is running is a no-op.
    pub fn start_sweeper(&self) -> Result<()> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| CacheError::RuntimeUnavailable(e.to_string()))?;

        let mut sweeper = lock(&self.inner.sweeper);
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        *sweeper = Some(spawn_cleanup_task(
            self.downgrade(),
            self.inner.config.cleanup_interval,
        ));
        Ok(())
    }

    pub fn is_sweeper_running(&self) -> bool {
        lock(&self.inner.sweeper)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Tears the cache down.
    ///
    /// Stops the sweeper, detaches every listener and stream, then drops all
    /// entries, edges and throttle state. No event is delivered after this
    /// returns. The handle stays usable as an empty cache.
    pub fn destroy(&self) {
        if let Some(handle) = lock(&self.inner.sweeper).take() {
            handle.abort();
        }
        self.inner.events.detach_all();
        let count = lock(&self.inner.store).clear();
        self.inner.destroyed.store(true, Ordering::SeqCst);
        info!("Cache manager destroyed: {} entries dropped", count);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}
