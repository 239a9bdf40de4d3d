//! Operation Options
//!
//! Per-call options for mutations, built with chained setters.

use std::time::Duration;

// == Set Options ==
/// Options accepted by `set_with` and the memoization helpers.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Overrides the configured default TTL
    pub ttl: Option<Duration>,
    /// Overrides the automatic version stamp
    pub version: Option<u64>,
    /// Keys the value was derived from
    pub dependencies: Vec<String>,
    /// Free-form origin tag carried on the emitted event
    pub source: Option<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Adds one upstream key.
    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.dependencies.push(key.into());
        self
    }

    /// Adds several upstream keys.
    pub fn dependencies<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// == Cascade Mode ==
/// How far an invalidation fans out through the dependency graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadeMode {
    /// Only the key itself
    None,
    /// The key and the keys that directly depend on it
    #[default]
    Direct,
    /// The key and every key reachable through dependents
    Transitive,
}

// == Invalidate Options ==
/// Options accepted by `invalidate_with` and `invalidate_prefix`.
#[derive(Debug, Clone, Default)]
pub struct InvalidateOptions {
    pub cascade: CascadeMode,
    pub source: Option<String>,
}

impl InvalidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cascade(mut self, cascade: CascadeMode) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// == Delete / Clear Options ==
/// Options accepted by `delete_with` and `clear_with`.
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub source: Option<String>,
}

impl RemoveOptions {
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
        }
    }
}
