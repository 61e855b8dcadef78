//! Integration tests for FreshMall.
//!
//! The tests in `tests/` exercise the shop library across module
//! boundaries: the registration-to-activation flow, the task envelope and
//! retry policy, form validation with the login redirect rules, and the
//! media store on a real filesystem.
//!
//! `tests/accounts.rs` also talks to live services and is `#[ignore]`d by
//! default. It needs:
//! - `DATABASE_URL` - a scratch `PostgreSQL` database (migrations are applied)
//! - `REDIS_URL` - a Redis database (default: `redis://127.0.0.1:6379/15`)
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p freshmall-integration-tests
//!
//! # Including the live-service tests
//! DATABASE_URL=postgres://localhost/freshmall_test \
//!     cargo test -p freshmall-integration-tests -- --include-ignored
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use freshmall_storefront::config::{MediaConfig, RedisConfig, SentryConfig, StorefrontConfig};
use freshmall_storefront::services::token::ActivationSigner;
use freshmall_storefront::state::{AppState, RedisConnections};

/// Signing key used across the tests.
pub const TEST_SECRET: &str = "k3x9-Pq7w-Zr2m-Lt8v-Hy4n-Bc6d-Fg1j-Ws5e";

const DEFAULT_TEST_REDIS_URL: &str = "redis://127.0.0.1:6379/15";

/// An activation signer over [`TEST_SECRET`].
#[must_use]
pub fn test_signer() -> ActivationSigner {
    ActivationSigner::new(SecretString::from(TEST_SECRET))
}

/// A username no other test run has used.
#[must_use]
pub fn unique_username() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
    format!("t{suffix}")
}

/// Connect to `DATABASE_URL` and apply the storefront migrations.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Storefront configuration pointing every Redis role at `REDIS_URL`.
#[must_use]
pub fn test_config(media_root: &Path) -> StorefrontConfig {
    let redis_url = SecretString::from(
        std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_TEST_REDIS_URL.to_string()),
    );

    StorefrontConfig {
        database_url: SecretString::from(std::env::var("DATABASE_URL").unwrap_or_default()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 8000,
        base_url: "http://localhost:8000".to_string(),
        secret_key: SecretString::from(TEST_SECRET),
        redis: RedisConfig {
            cache_url: redis_url.clone(),
            session_url: redis_url.clone(),
            broker_url: redis_url.clone(),
            result_backend_url: redis_url,
        },
        media: MediaConfig {
            root: media_root.to_path_buf(),
            url: "/media".to_string(),
        },
        sentry: SentryConfig::default(),
    }
}

/// Application state over the test database and Redis.
///
/// # Panics
///
/// Panics if either service is unreachable.
pub async fn test_state(media_root: &Path) -> AppState {
    let config = test_config(media_root);
    let pool = test_pool().await;
    let redis = RedisConnections::connect(&config.redis)
        .await
        .expect("Failed to connect to Redis (set REDIS_URL)");
    AppState::new(&config, pool, &redis)
}
