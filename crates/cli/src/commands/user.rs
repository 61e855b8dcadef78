//! User management commands.

use freshmall_storefront::db::UserRepository;

/// Activate a user without the e-mail link.
///
/// # Errors
///
/// Returns an error if the database is unreachable or no such user exists.
pub async fn activate(username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    if !UserRepository::new(&pool).activate_by_username(username).await? {
        return Err(format!("No user named {username}").into());
    }

    tracing::info!(username, "User activated");
    Ok(())
}
