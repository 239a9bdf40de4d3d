//! Event Channel
//!
//! Observer registry plus broadcast stream, fed through the throttler.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::warn;

use crate::config::CacheConfig;
use crate::events::{CacheEvent, CacheEventKind, EventThrottler};
use crate::sync::{lock, read, write};

/// Callback invoked synchronously for each delivered event.
pub type Listener<V> = Arc<dyn Fn(&CacheEvent<V>) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which events a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every event
    All,
    /// Only events of one kind
    Kind(CacheEventKind),
}

struct Registry<V> {
    next_id: u64,
    listeners: HashMap<Topic, Vec<(ListenerId, Listener<V>)>>,
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
        }
    }
}

// == Event Channel ==
/// Publishes cache events to registered listeners and stream subscribers.
pub struct EventChannel<V> {
    /// None when throttling is disabled
    throttler: Option<Mutex<EventThrottler>>,
    registry: RwLock<Registry<V>>,
    stream: Mutex<Option<broadcast::Sender<CacheEvent<V>>>>,
    buffer: usize,
    /// Bumped by `detach_all`; a dispatch started under an older value stops.
    generation: AtomicU64,
}

impl<V> fmt::Debug for EventChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("throttled", &self.throttler.is_some())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<V> EventChannel<V> {
    pub fn listener_count(&self) -> usize {
        read(&self.registry).listeners.values().map(Vec::len).sum()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl<V: Clone> EventChannel<V> {
    pub fn new(config: &CacheConfig) -> Self {
        let throttler = config.enable_event_throttling.then(|| {
            let window_ms = u64::try_from(config.throttle_window.as_millis()).unwrap_or(u64::MAX);
            Mutex::new(EventThrottler::new(window_ms))
        });
        let buffer = config.event_buffer.max(1);

        Self {
            throttler,
            registry: RwLock::new(Registry::default()),
            stream: Mutex::new(None),
            buffer,
            generation: AtomicU64::new(0),
        }
    }

    // == Subscribe ==
    pub fn subscribe(&self, topic: Topic, listener: Listener<V>) -> ListenerId {
        let mut registry = write(&self.registry);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry
            .listeners
            .entry(topic)
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = write(&self.registry);
        let mut removed = false;
        for listeners in registry.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            removed |= listeners.len() != before;
        }
        registry.listeners.retain(|_, listeners| !listeners.is_empty());
        removed
    }

    // == Event Stream ==
    /// Opens a broadcast receiver carrying every delivered event.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer overflows.
    pub fn event_stream(&self) -> broadcast::Receiver<CacheEvent<V>> {
        let mut stream = lock(&self.stream);
        match stream.as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.buffer);
                *stream = Some(sender);
                receiver
            }
        }
    }

    // == Emit ==
    /// Delivers an event unless throttled. Returns whether it was delivered.
    ///
    /// Generic listeners run before kind-specific ones. Dispatch works on a
    /// snapshot, so listeners may subscribe or unsubscribe while running. A
    /// panicking listener is logged and skipped. Once `detach_all` runs, the
    /// rest of an in-flight snapshot is dropped.
    pub fn emit(&self, event: CacheEvent<V>) -> bool {
        if let Some(throttler) = &self.throttler {
            if !lock(throttler).should_emit(event.kind, &event.key, event.timestamp) {
                return false;
            }
        }

        let (generation, snapshot): (u64, Vec<(ListenerId, Listener<V>)>) = {
            let registry = read(&self.registry);
            let listeners = [Topic::All, Topic::Kind(event.kind)]
                .iter()
                .filter_map(|topic| registry.listeners.get(topic))
                .flatten()
                .cloned()
                .collect();
            (self.generation.load(Ordering::SeqCst), listeners)
        };

        for (id, listener) in snapshot {
            if !self.is_current(generation) {
                return true;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(
                    "Listener {:?} panicked while handling {} for key '{}'",
                    id, event.kind, event.key
                );
            }
        }

        let stream = lock(&self.stream);
        match stream.as_ref() {
            Some(sender) if self.is_current(generation) => {
                // No receivers is not an error.
                let _ = sender.send(event);
            }
            _ => {}
        }
        true
    }

    /// Forgets expired throttle bookkeeping.
    pub fn prune_throttle(&self, now: u64) -> usize {
        self.throttler
            .as_ref()
            .map(|throttler| lock(throttler).prune(now))
            .unwrap_or(0)
    }

    // == Detach All ==
    /// Drops every listener, closes the stream and forgets throttle state.
    pub fn detach_all(&self) {
        {
            let mut registry = write(&self.registry);
            self.generation.fetch_add(1, Ordering::SeqCst);
            registry.listeners.clear();
        }
        lock(&self.stream).take();
        if let Some(throttler) = &self.throttler {
            lock(throttler).clear();
        }
    }
}
