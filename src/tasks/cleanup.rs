//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::WeakCacheManager;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task sleeps for `interval` between sweeps and holds only a weak handle,
/// so it ends on its own once the last [`crate::CacheManager`] is dropped.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheManager::<String>::new(CacheConfig::default())?;
/// let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: WeakCacheManager<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, stopping TTL cleanup task");
                break;
            };
            let removed = cache.cleanup();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::SetOptions;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::manager::CacheManager;

    fn cache_with_clock() -> (CacheManager<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = CacheManager::with_clock(CacheConfig::default(), clock.clone()).unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set_with(
            "expire_soon",
            "value".to_string(),
            SetOptions::new().ttl(Duration::from_millis(100)),
        );
        cache.set("long_lived", "value".to_string());

        let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_millis(20));
        clock.advance(150);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // size() counts stale entries too, so this proves the sweep ran
        assert_eq!(cache.size(), 1);
        assert!(cache.has("long_lived"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_when_cache_dropped() {
        let (cache, _) = cache_with_clock();
        let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_millis(10));

        drop(cache);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "Task should end once the cache is gone");
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (cache, _) = cache_with_clock();
        let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
