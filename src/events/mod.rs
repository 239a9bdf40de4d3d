//! Events Module
//!
//! Change notifications published by the cache manager.
//!
//! # Event types
//! - `cache:set` - a value was stored
//! - `cache:get` - a fresh value was read
//! - `cache:delete` - a value was deleted explicitly or evicted
//! - `cache:expired` - a stale value was removed
//! - `cache:invalidated` - a key and its dependents were invalidated
//! - `cache:clear` - the whole cache was emptied (key `*`)

mod channel;
mod throttle;

use std::fmt;

use serde::Serialize;

pub use channel::{EventChannel, Listener, ListenerId, Topic};
pub use throttle::EventThrottler;

/// Key carried by `cache:clear` events.
pub const WILDCARD_KEY: &str = "*";

/// Source tag on `cache:delete` events caused by LRU eviction.
pub const EVICTION_SOURCE: &str = "lru-eviction";

// == Event Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEventKind {
    Set,
    Get,
    Delete,
    Expired,
    Invalidated,
    Clear,
}

impl CacheEventKind {
    pub const ALL: [CacheEventKind; 6] = [
        CacheEventKind::Set,
        CacheEventKind::Get,
        CacheEventKind::Delete,
        CacheEventKind::Expired,
        CacheEventKind::Invalidated,
        CacheEventKind::Clear,
    ];

    /// Wire name, e.g. `cache:set`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEventKind::Set => "cache:set",
            CacheEventKind::Get => "cache:get",
            CacheEventKind::Delete => "cache:delete",
            CacheEventKind::Expired => "cache:expired",
            CacheEventKind::Invalidated => "cache:invalidated",
            CacheEventKind::Clear => "cache:clear",
        }
    }
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Event ==
/// A single notification delivered to listeners.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEvent<V> {
    pub kind: CacheEventKind,
    pub key: String,
    /// The stored value for `set` and `get` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<V>,
    /// Emission time (Unix milliseconds)
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl<V> CacheEvent<V> {
    pub fn new(kind: CacheEventKind, key: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind,
            key: key.into(),
            data: None,
            timestamp,
            source: None,
        }
    }

    pub fn with_data(mut self, data: V) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let names: Vec<&str> = CacheEventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cache:set",
                "cache:get",
                "cache:delete",
                "cache:expired",
                "cache:invalidated",
                "cache:clear"
            ]
        );
        assert_eq!(CacheEventKind::Set.to_string(), "cache:set");
    }

    #[test]
    fn test_event_serializes_without_empty_fields() {
        let event: CacheEvent<u32> = CacheEvent::new(CacheEventKind::Clear, WILDCARD_KEY, 7);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "clear");
        assert_eq!(json["key"], "*");
        assert_eq!(json["timestamp"], 7);
        assert!(json.get("data").is_none());
        assert!(json.get("source").is_none());
    }

    #[test]
    fn test_event_builders() {
        let event = CacheEvent::new(CacheEventKind::Set, "k", 1)
            .with_data(5)
            .with_source(Some("loader".to_string()));

        assert_eq!(event.data, Some(5));
        assert_eq!(event.source.as_deref(), Some("loader"));
    }
}
