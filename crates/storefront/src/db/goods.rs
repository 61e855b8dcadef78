//! Catalogue repository for database operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use freshmall_core::{GoodsId, GoodsTypeId, Price, SkuId, SkuStatus};

use super::RepositoryError;
use crate::models::GoodsSku;
use crate::models::goods::{NewGoodsType, NewSku};

const SKU_COLUMNS: &str = "id, type_id, goods_id, name, description, price, unite, image, \
                           stock, sales, status, created_at";

#[derive(Debug, sqlx::FromRow)]
struct SkuRow {
    id: SkuId,
    type_id: GoodsTypeId,
    goods_id: GoodsId,
    name: String,
    description: String,
    price: Price,
    unite: String,
    image: String,
    stock: i32,
    sales: i32,
    status: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<SkuRow> for GoodsSku {
    type Error = RepositoryError;

    fn try_from(row: SkuRow) -> Result<Self, Self::Error> {
        let status = SkuStatus::from_code(row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid SKU status: {}", row.status))
        })?;

        Ok(Self {
            id: row.id,
            type_id: row.type_id,
            goods_id: row.goods_id,
            name: row.name,
            description: row.description,
            price: row.price,
            unite: row.unite,
            image: row.image,
            stock: row.stock,
            sales: row.sales,
            status,
            created_at: row.created_at,
        })
    }
}

/// Repository for catalogue operations.
pub struct GoodsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GoodsRepository<'a> {
    /// Create a new catalogue repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a SKU by ID, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_sku(&self, id: SkuId) -> Result<Option<GoodsSku>, RepositoryError> {
        let row = sqlx::query_as::<_, SkuRow>(&format!(
            "SELECT {SKU_COLUMNS} FROM freshmall.goods_sku WHERE id = $1 AND NOT is_deleted"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(GoodsSku::try_from).transpose()
    }

    /// Get several SKUs, returned in the order of `ids`.
    ///
    /// IDs that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_skus(&self, ids: &[SkuId]) -> Result<Vec<GoodsSku>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<i32> = ids.iter().map(SkuId::as_i32).collect();
        let rows = sqlx::query_as::<_, SkuRow>(&format!(
            "SELECT {SKU_COLUMNS} FROM freshmall.goods_sku WHERE id = ANY($1) AND NOT is_deleted"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        let mut by_id = rows
            .into_iter()
            .map(|row| GoodsSku::try_from(row).map(|sku| (sku.id, sku)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// The newest online SKUs, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_online(&self, limit: i64) -> Result<Vec<GoodsSku>, RepositoryError> {
        let rows = sqlx::query_as::<_, SkuRow>(&format!(
            r"
            SELECT {SKU_COLUMNS}
            FROM freshmall.goods_sku
            WHERE status = $1 AND NOT is_deleted
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(SkuStatus::Online.code())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(GoodsSku::try_from).collect()
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a category with this name exists.
    pub async fn create_type(&self, goods_type: &NewGoodsType) -> Result<GoodsTypeId, RepositoryError> {
        let (id,): (GoodsTypeId,) = sqlx::query_as(
            r"
            INSERT INTO freshmall.goods_type (name, logo, image)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(&goods_type.name)
        .bind(&goods_type.logo)
        .bind(&goods_type.image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "goods type"))?;

        Ok(id)
    }

    /// Find a category by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_type_by_name(&self, name: &str) -> Result<Option<GoodsTypeId>, RepositoryError> {
        let row: Option<(GoodsTypeId,)> = sqlx::query_as(
            "SELECT id FROM freshmall.goods_type WHERE name = $1 AND NOT is_deleted",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Create a product (SPU).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_goods(&self, name: &str, detail: &str) -> Result<GoodsId, RepositoryError> {
        let (id,): (GoodsId,) = sqlx::query_as(
            "INSERT INTO freshmall.goods (name, detail) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(detail)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Create a SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_sku(&self, sku: &NewSku) -> Result<SkuId, RepositoryError> {
        let (id,): (SkuId,) = sqlx::query_as(
            r"
            INSERT INTO freshmall.goods_sku
                (type_id, goods_id, name, description, price, unite, image, stock, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(sku.type_id)
        .bind(sku.goods_id)
        .bind(&sku.name)
        .bind(&sku.description)
        .bind(sku.price)
        .bind(&sku.unite)
        .bind(&sku.image)
        .bind(sku.stock)
        .bind(sku.status.code())
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Point a SKU at a stored media file.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the SKU does not exist.
    pub async fn set_sku_image(&self, id: SkuId, image: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE freshmall.goods_sku
            SET image = $2, updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            ",
        )
        .bind(id)
        .bind(image)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
