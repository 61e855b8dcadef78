//! Catalogue domain types.

use chrono::{DateTime, Utc};

use freshmall_core::{GoodsId, GoodsTypeId, Price, SkuId, SkuStatus};

/// A purchasable product variant.
#[derive(Debug, Clone)]
pub struct GoodsSku {
    pub id: SkuId,
    pub type_id: GoodsTypeId,
    pub goods_id: GoodsId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Sales unit, e.g. `500g` or `box`.
    pub unite: String,
    /// Media file id of the main image (empty when no image was uploaded).
    pub image: String,
    pub stock: i32,
    pub sales: i32,
    pub status: SkuStatus,
    pub created_at: DateTime<Utc>,
}

impl GoodsSku {
    /// Whether the SKU is listed in the shop.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == SkuStatus::Online
    }
}

/// A product category.
#[derive(Debug, Clone)]
pub struct GoodsType {
    pub id: GoodsTypeId,
    pub name: String,
    /// CSS class used for the category icon.
    pub logo: String,
    /// Media file id of the category banner.
    pub image: String,
}

/// Data for a new category.
#[derive(Debug, Clone)]
pub struct NewGoodsType {
    pub name: String,
    pub logo: String,
    pub image: String,
}

/// Data for a new SKU.
#[derive(Debug, Clone)]
pub struct NewSku {
    pub type_id: GoodsTypeId,
    pub goods_id: GoodsId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub unite: String,
    pub image: String,
    pub stock: i32,
    pub status: SkuStatus,
}
