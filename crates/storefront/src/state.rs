//! Application state shared across handlers.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::cache::{self, IndexCache};
use crate::config::{RedisConfig, StorefrontConfig};
use crate::services::history::BrowseHistory;
use crate::services::token::ActivationSigner;
use crate::storage::MediaStorage;
use crate::tasks::TaskQueue;

/// One managed connection per Redis logical database.
#[derive(Clone)]
pub struct RedisConnections {
    pub cache: ConnectionManager,
    pub sessions: ConnectionManager,
    pub broker: ConnectionManager,
    pub results: ConnectionManager,
}

impl RedisConnections {
    /// Connect to all four databases.
    ///
    /// # Errors
    ///
    /// Returns `RedisError` if any database is unreachable.
    pub async fn connect(config: &RedisConfig) -> Result<Self, redis::RedisError> {
        Ok(Self {
            cache: cache::connect(&config.cache_url).await?,
            sessions: cache::connect(&config.session_url).await?,
            broker: cache::connect(&config.broker_url).await?,
            results: cache::connect(&config.result_backend_url).await?,
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and Redis-backed services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    history: BrowseHistory,
    tasks: TaskQueue,
    signer: ActivationSigner,
    storage: MediaStorage,
    index_cache: IndexCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `redis` - Redis connections
    #[must_use]
    pub fn new(config: &StorefrontConfig, pool: PgPool, redis: &RedisConnections) -> Self {
        let signer = ActivationSigner::new(config.secret_key.clone());
        let storage = MediaStorage::from_config(&config.media);

        Self {
            inner: Arc::new(AppStateInner {
                history: BrowseHistory::new(redis.cache.clone()),
                tasks: TaskQueue::new(redis.broker.clone(), redis.results.clone()),
                index_cache: cache::index_cache(),
                pool,
                signer,
                storage,
            }),
        }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Recently viewed SKUs.
    #[must_use]
    pub fn history(&self) -> &BrowseHistory {
        &self.inner.history
    }

    /// Background task queue.
    #[must_use]
    pub fn tasks(&self) -> &TaskQueue {
        &self.inner.tasks
    }

    /// Activation token signer.
    #[must_use]
    pub fn signer(&self) -> &ActivationSigner {
        &self.inner.signer
    }

    /// Media file store.
    #[must_use]
    pub fn storage(&self) -> &MediaStorage {
        &self.inner.storage
    }

    /// In-process cache of the index listing.
    #[must_use]
    pub fn index_cache(&self) -> &IndexCache {
        &self.inner.index_cache
    }
}
