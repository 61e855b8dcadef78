//! Session middleware configuration.
//!
//! Sets up Redis-backed sessions using tower-sessions.

use redis::aio::ConnectionManager;
use tower_sessions::{Expiry, SessionManagerLayer};

use super::session_store::RedisStore;
use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "freshmall_session";

/// Session expiry time in seconds (14 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Create the session layer with the Redis store.
///
/// # Arguments
///
/// * `conn` - Connection to the session database
/// * `config` - Storefront configuration (for the cookie `Secure` flag)
#[must_use]
pub fn create_session_layer(
    conn: ConnectionManager,
    config: &StorefrontConfig,
) -> SessionManagerLayer<RedisStore> {
    let store = RedisStore::new(conn);

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
