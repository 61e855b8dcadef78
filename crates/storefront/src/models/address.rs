//! Delivery address domain types.

use chrono::{DateTime, Utc};

use freshmall_core::{AddressId, Phone, UserId};

/// A delivery address belonging to a user.
#[derive(Debug, Clone)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Name of the person receiving the delivery.
    pub receiver: String,
    /// Full street address.
    pub addr: String,
    pub zip_code: Option<String>,
    pub phone: Phone,
    /// The address used by default at checkout. At most one per user.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Data for a new address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub receiver: String,
    pub addr: String,
    pub zip_code: Option<String>,
    pub phone: Phone,
}
