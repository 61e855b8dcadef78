//! Address repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use freshmall_core::{AddressId, Phone, UserId};

use super::RepositoryError;
use crate::models::Address;
use crate::models::address::NewAddress;

const ADDRESS_COLUMNS: &str =
    "id, user_id, receiver, addr, zip_code, phone, is_default, created_at";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    receiver: String,
    addr: String,
    zip_code: Option<String>,
    phone: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            receiver: row.receiver,
            addr: row.addr,
            zip_code: row.zip_code,
            phone,
            is_default: row.is_default,
            created_at: row.created_at,
        })
    }
}

/// Repository for delivery address operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's default address, if they have one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_default(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM freshmall.address
            WHERE user_id = $1 AND is_default AND NOT is_deleted
            "
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    /// Add an address for the user.
    ///
    /// The new address becomes the default only when the user has no default
    /// address yet. If a concurrent insert claims the default first, the
    /// address is stored as non-default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        match self.insert(user_id, address, None).await {
            Err(RepositoryError::Conflict(_)) => self.insert(user_id, address, Some(false)).await,
            other => other,
        }
    }

    /// Insert an address. `is_default: None` lets the database decide based
    /// on whether a default already exists.
    async fn insert(
        &self,
        user_id: UserId,
        address: &NewAddress,
        is_default: Option<bool>,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            INSERT INTO freshmall.address (user_id, receiver, addr, zip_code, phone, is_default)
            VALUES (
                $1, $2, $3, $4, $5,
                COALESCE($6, NOT EXISTS (
                    SELECT 1 FROM freshmall.address
                    WHERE user_id = $1 AND is_default AND NOT is_deleted
                ))
            )
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&address.receiver)
        .bind(&address.addr)
        .bind(address.zip_code.as_deref())
        .bind(address.phone.as_str())
        .bind(is_default)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "default address"))?;

        Address::try_from(row)
    }
}
