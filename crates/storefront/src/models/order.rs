//! Order domain types.

use chrono::{DateTime, Utc};

use freshmall_core::{AddressId, OrderId, OrderStatus, PayMethod, Price, SkuId, UserId};

/// A placed order with its lines.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub pay_method: PayMethod,
    /// Number of items across all lines.
    pub total_count: i32,
    /// Price of the goods, excluding delivery.
    pub total_price: Price,
    /// Delivery charge.
    pub transit_price: Price,
    pub status: OrderStatus,
    /// Payment provider transaction number, once paid.
    pub trade_no: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Amount payable: goods plus delivery.
    #[must_use]
    pub fn total_payable(&self) -> Price {
        self.total_price + self.transit_price
    }
}

/// One SKU within an order, with the SKU details needed for display.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub sku_id: SkuId,
    pub sku_name: String,
    pub sku_image: String,
    pub sku_unite: String,
    pub count: i32,
    /// Unit price at the time of ordering.
    pub price: Price,
}

impl OrderLine {
    /// Line amount: unit price times count.
    #[must_use]
    pub fn amount(&self) -> Price {
        self.price.times(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_amount_and_total_payable() {
        let line = OrderLine {
            sku_id: SkuId::new(1),
            sku_name: "Strawberries".to_string(),
            sku_image: String::new(),
            sku_unite: "500g".to_string(),
            count: 3,
            price: Price::from_fen(1650),
        };
        assert_eq!(line.amount(), Price::from_fen(4950));

        let order = Order {
            order_id: OrderId::new("2024010112000001"),
            user_id: UserId::new(1),
            address_id: AddressId::new(1),
            pay_method: PayMethod::Alipay,
            total_count: 3,
            total_price: line.amount(),
            transit_price: Price::from_fen(1000),
            status: OrderStatus::Unpaid,
            trade_no: String::new(),
            created_at: Utc::now(),
            lines: vec![line],
        };
        assert_eq!(order.total_payable(), Price::from_fen(5950));
    }
}
