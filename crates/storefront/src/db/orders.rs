//! Order repository for database operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use freshmall_core::{AddressId, OrderId, OrderStatus, PayMethod, Price, SkuId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderLine};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    user_id: UserId,
    address_id: AddressId,
    pay_method: i16,
    total_count: i32,
    total_price: Price,
    transit_price: Price,
    order_status: i16,
    trade_no: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let pay_method = PayMethod::from_code(row.pay_method).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid pay method: {}", row.pay_method))
        })?;
        let status = OrderStatus::from_code(row.order_status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid order status: {}", row.order_status))
        })?;

        Ok(Self {
            order_id: OrderId::new(row.order_id),
            user_id: row.user_id,
            address_id: row.address_id,
            pay_method,
            total_count: row.total_count,
            total_price: row.total_price,
            transit_price: row.transit_price,
            status,
            trade_no: row.trade_no,
            created_at: row.created_at,
            lines: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: String,
    sku_id: SkuId,
    sku_name: String,
    sku_image: String,
    sku_unite: String,
    count: i32,
    price: Price,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            sku_id: row.sku_id,
            sku_name: row.sku_name,
            sku_image: row.sku_image,
            sku_unite: row.sku_unite,
            count: row.count,
            price: row.price,
        }
    }
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of orders the user has placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM freshmall.order_info WHERE user_id = $1 AND NOT is_deleted",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// One page of the user's orders, newest first, each with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored code is unknown.
    pub async fn page_for_user(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT order_id, user_id, address_id, pay_method, total_count, total_price,
                   transit_price, order_status, trade_no, created_at
            FROM freshmall.order_info
            WHERE user_id = $1 AND NOT is_deleted
            ORDER BY created_at DESC, order_id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let mut orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if orders.is_empty() {
            return Ok(orders);
        }

        let order_ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        let line_rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT og.order_id, og.sku_id, s.name AS sku_name, s.image AS sku_image,
                   s.unite AS sku_unite, og.count, og.price
            FROM freshmall.order_goods og
            JOIN freshmall.goods_sku s ON s.id = og.sku_id
            WHERE og.order_id = ANY($1) AND NOT og.is_deleted
            ORDER BY og.id
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut lines_by_order: HashMap<String, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            lines_by_order
                .entry(row.order_id.clone())
                .or_default()
                .push(OrderLine::from(row));
        }

        for order in &mut orders {
            order.lines = lines_by_order
                .remove(order.order_id.as_str())
                .unwrap_or_default();
        }

        Ok(orders)
    }
}
