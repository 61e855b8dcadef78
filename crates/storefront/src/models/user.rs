//! User domain types.

use chrono::{DateTime, Utc};

use freshmall_core::{Email, UserId};

/// A registered shop user.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name (unique).
    pub username: String,
    /// Contact and activation address.
    pub email: Email,
    /// Whether the account has been activated via the e-mail link.
    pub is_active: bool,
    /// Staff accounts may use management tooling.
    pub is_staff: bool,
    /// When the user registered.
    pub date_joined: DateTime<Utc>,
}
