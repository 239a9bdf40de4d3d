//! Cache Consistency demo
//!
//! Runs a short derived-data workload against a cache built from the
//! environment and prints the resulting statistics as JSON.

use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_consistency::{
    keys, CacheConfig, CacheEvent, CacheManager, InvalidateOptions, SetOptions,
};

/// Entry point for the demo binary.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache manager and start the background sweep
/// 4. Cache a profile and values derived from it
/// 5. Invalidate the profile and show the dependents disappear
/// 6. Print statistics and tear the cache down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_consistency=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: max_size={}, default_ttl={:?}, throttle_window={:?}, cleanup_interval={:?}",
        config.max_size, config.default_ttl, config.throttle_window, config.cleanup_interval
    );

    let cache: CacheManager<Value> =
        CacheManager::new(config).context("invalid cache configuration")?;
    cache
        .start_sweeper()
        .context("failed to start the expiry sweep")?;

    cache.subscribe(|event: &CacheEvent<Value>| {
        info!("{} {}", event.kind, event.key);
    });

    let profile_key = keys::entity_key("profile", 1);
    let user_key = keys::entity_key("user", 1);
    let deck_key = keys::list_key("deck", &json!({ "owner": 1, "archived": false }))?;

    cache.set(&profile_key, json!({ "name": "Ada", "locale": "en" }));
    cache.set_with(
        &user_key,
        json!({ "display": "Ada (en)" }),
        SetOptions::new()
            .ttl(Duration::from_secs(30))
            .depends_on(profile_key.as_str()),
    );

    let decks = cache
        .memoize(
            &deck_key,
            SetOptions::new().depends_on(user_key.as_str()),
            || async { json!(["Spanish verbs", "Rust lifetimes"]) },
        )
        .await;
    info!("Loaded decks: {}", decks);

    info!("Dependents of {}: {:?}", profile_key, cache.dependents(&profile_key));
    cache.invalidate_with(&profile_key, InvalidateOptions::new().source("demo"));
    info!("Keys after invalidation: {:?}", cache.keys());

    println!("{}", serde_json::to_string_pretty(&cache.stats())?);

    cache.destroy();
    info!("Demo complete");
    Ok(())
}
