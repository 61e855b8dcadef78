//! Redis connections and in-process caches.
//!
//! Each Redis logical database (cache, sessions, broker, results) gets its own
//! `ConnectionManager`, which multiplexes requests over one connection and
//! reconnects on failure.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use redis::{
    Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use secrecy::{ExposeSecret, SecretString};

use crate::models::GoodsSku;

/// How long the rendered index listing stays cached.
pub const INDEX_CACHE_TTL: Duration = Duration::from_secs(300);

/// In-process cache of the index page SKU listing, keyed by page name.
pub type IndexCache = Cache<&'static str, Arc<Vec<GoodsSku>>>;

/// Build the index listing cache.
#[must_use]
pub fn index_cache() -> IndexCache {
    Cache::builder()
        .max_capacity(16)
        .time_to_live(INDEX_CACHE_TTL)
        .build()
}

/// Open a managed connection to a Redis database.
///
/// # Errors
///
/// Returns `RedisError` if the URL is invalid or the server is unreachable.
pub async fn connect(url: &SecretString) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_secs(2));

    let client = Client::open(url.expose_secret())?;
    client.get_connection_manager_with_config(config).await
}

/// Connection to a scratch Redis database for tests that need a live server.
///
/// Uses `REDIS_URL`, defaulting to database 15 on localhost.
#[cfg(test)]
pub(crate) async fn test_connection() -> ConnectionManager {
    let url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    connect(&SecretString::from(url))
        .await
        .expect("Failed to connect to Redis (set REDIS_URL)")
}
