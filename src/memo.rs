//! Memoization helpers.
//!
//! Sugar over `get` and `set_with` that turns an async computation into a
//! cached one. Concurrent misses on the same key each run the computation;
//! the last writer wins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::cache::SetOptions;
use crate::manager::CacheManager;

/// Boxed future returned by [`memoized`] wrappers.
pub type MemoFuture<V> = Pin<Box<dyn Future<Output = V> + Send>>;

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Memoize ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    pub async fn memoize<F, Fut>(&self, key: &str, options: SetOptions, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        debug!("Memoize miss for '{}', computing", key);
        let value = compute().await;
        self.set_with(key, value.clone(), options);
        value
    }

    /// Fallible [`Self::memoize`]: errors are returned and never cached.
    pub async fn try_memoize<F, Fut, E>(
        &self,
        key: &str,
        options: SetOptions,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.set_with(key, value.clone(), options);
        Ok(value)
    }
}

// == Memoized ==
/// Wraps an async function so its results are cached under `key_fn(&args)`.
///
/// Every call uses a copy of `options` (TTL, dependencies, version).
///
/// # Example
/// ```ignore
/// let load_user = memoized(
///     cache.clone(),
///     |id: &u64| keys::entity_key("user", id),
///     SetOptions::new().ttl(Duration::from_secs(30)),
///     |id: u64| async move { fetch_user(id).await },
/// );
/// let user = load_user(7).await;
/// ```
pub fn memoized<A, V, K, F, Fut>(
    cache: CacheManager<V>,
    key_fn: K,
    options: SetOptions,
    f: F,
) -> impl Fn(A) -> MemoFuture<V>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
    K: Fn(&A) -> String + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = V> + Send + 'static,
{
    let f = Arc::new(f);
    move |args: A| -> MemoFuture<V> {
        let key = key_fn(&args);
        let cache = cache.clone();
        let options = options.clone();
        let f = Arc::clone(&f);
        Box::pin(async move { cache.memoize(&key, options, move || f(args)).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::clock::ManualClock;
    use crate::config::CacheConfig;

    fn cache() -> (CacheManager<u64>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = CacheManager::with_clock(CacheConfig::default(), clock.clone()).unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_memoize_computes_once() {
        let (cache, _) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .memoize("answer", SetOptions::new(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(value, 42);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_memoize_recomputes_after_ttl() {
        let (cache, clock) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let opts = SetOptions::new().ttl(Duration::from_millis(50));

        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            1
        };
        cache.memoize("k", opts.clone(), compute).await;
        clock.advance(50);
        cache.memoize("k", opts, compute).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_memoize_recomputes_after_dependency_invalidated() {
        let (cache, _) = cache();
        let opts = SetOptions::new().depends_on("profile:1");

        cache.memoize("user:1", opts.clone(), || async { 1 }).await;
        cache.invalidate("profile:1");
        let value = cache.memoize("user:1", opts, || async { 2 }).await;

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_try_memoize_does_not_cache_errors() {
        let (cache, _) = cache();

        let failed: Result<u64, String> = cache
            .try_memoize("k", SetOptions::new(), || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(!cache.has("k"));

        let ok: Result<u64, String> = cache
            .try_memoize("k", SetOptions::new(), || async { Ok(5) })
            .await;
        assert_eq!(ok, Ok(5));
        assert_eq!(cache.get("k"), Some(5));
    }

    #[tokio::test]
    async fn test_memoized_wrapper_keys_by_argument() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let square = memoized(
            cache.clone(),
            |n: &u64| format!("square:{n}"),
            SetOptions::new(),
            move |n: u64| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    n * n
                }
            },
        );

        assert_eq!(square(3).await, 9);
        assert_eq!(square(3).await, 9);
        assert_eq!(square(4).await, 16);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.keys(), vec!["square:3".to_string(), "square:4".to_string()]);
    }
}
