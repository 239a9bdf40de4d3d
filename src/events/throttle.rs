//! Event Throttler
//!
//! Per (event type, key) cooldown gate for notifications.

use std::collections::HashMap;

use crate::events::CacheEventKind;

/// Size below which `should_emit` never prunes.
const MIN_PRUNE_THRESHOLD: usize = 64;

// == Event Throttler ==
/// Remembers when each `type:key` pair last fired.
///
/// Only affects notifications; store mutations never consult it. Elapsed
/// pairs are pruned whenever the map doubles since the last prune, so memory
/// stays bounded by the number of pairs active within one window.
#[derive(Debug)]
pub struct EventThrottler {
    window_ms: u64,
    last_emitted: HashMap<String, u64>,
    prune_threshold: usize,
}

impl EventThrottler {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_emitted: HashMap::new(),
            prune_threshold: MIN_PRUNE_THRESHOLD,
        }
    }

    // == Should Emit ==
    /// Returns true and records `now` if the pair is outside its cooldown.
    pub fn should_emit(&mut self, kind: CacheEventKind, key: &str, now: u64) -> bool {
        if self.last_emitted.len() >= self.prune_threshold {
            self.prune(now);
        }

        let throttle_key = format!("{}:{}", kind.as_str(), key);
        match self.last_emitted.get(&throttle_key) {
            Some(&last) if now.saturating_sub(last) < self.window_ms => false,
            _ => {
                self.last_emitted.insert(throttle_key, now);
                true
            }
        }
    }

    // == Prune ==
    /// Forgets pairs whose cooldown has elapsed. Returns how many were dropped.
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.last_emitted.len();
        let window = self.window_ms;
        self.last_emitted
            .retain(|_, last| now.saturating_sub(*last) < window);
        self.prune_threshold = (self.last_emitted.len() * 2).max(MIN_PRUNE_THRESHOLD);
        before - self.last_emitted.len()
    }

    pub fn clear(&mut self) {
        self.last_emitted.clear();
        self.prune_threshold = MIN_PRUNE_THRESHOLD;
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }
}
