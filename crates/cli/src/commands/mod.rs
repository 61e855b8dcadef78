//! CLI subcommands.

pub mod media;
pub mod migrate;
pub mod seed;
pub mod task;
pub mod user;

use freshmall_storefront::config;
use sqlx::PgPool;

/// Connect to the shop database named by the environment.
pub(crate) async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url = config::database_url()?;
    tracing::info!("Connecting to database...");
    let pool = freshmall_storefront::db::create_pool(&database_url).await?;
    Ok(pool)
}
