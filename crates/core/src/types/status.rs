//! Status enums for various entities.
//!
//! All of these are stored as `SMALLINT` codes, so each enum carries an
//! explicit discriminant and converts from the raw code.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum OrderStatus {
    #[default]
    Unpaid = 1,
    AwaitingShipment = 2,
    AwaitingReceipt = 3,
    AwaitingReview = 4,
    Completed = 5,
}

impl OrderStatus {
    /// Convert a stored status code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Unpaid),
            2 => Some(Self::AwaitingShipment),
            3 => Some(Self::AwaitingReceipt),
            4 => Some(Self::AwaitingReview),
            5 => Some(Self::Completed),
            _ => None,
        }
    }

    /// The stored status code.
    #[must_use]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Human-readable label shown in the order list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::AwaitingShipment => "Awaiting shipment",
            Self::AwaitingReceipt => "Awaiting receipt",
            Self::AwaitingReview => "Awaiting review",
            Self::Completed => "Completed",
        }
    }
}

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum PayMethod {
    CashOnDelivery = 1,
    WechatPay = 2,
    Alipay = 3,
    UnionPay = 4,
}

impl PayMethod {
    /// Convert a stored payment method code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::CashOnDelivery),
            2 => Some(Self::WechatPay),
            3 => Some(Self::Alipay),
            4 => Some(Self::UnionPay),
            _ => None,
        }
    }

    /// The stored payment method code.
    #[must_use]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on delivery",
            Self::WechatPay => "WeChat Pay",
            Self::Alipay => "Alipay",
            Self::UnionPay => "UnionPay",
        }
    }
}

/// Whether a SKU is listed in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum SkuStatus {
    Offline = 0,
    #[default]
    Online = 1,
}

impl SkuStatus {
    /// Convert a stored status code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Offline),
            1 => Some(Self::Online),
            _ => None,
        }
    }

    /// The stored status code.
    #[must_use]
    pub const fn code(self) -> i16 {
        self as i16
    }
}

impl std::str::FromStr for SkuStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("invalid sku status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_codes_roundtrip() {
        for code in 1..=5 {
            let status = OrderStatus::from_code(code).map(OrderStatus::code);
            assert_eq!(status, Some(code));
        }
        assert_eq!(OrderStatus::from_code(0), None);
        assert_eq!(OrderStatus::from_code(6), None);
    }

    #[test]
    fn test_pay_method_labels() {
        assert_eq!(PayMethod::from_code(3).map(PayMethod::label), Some("Alipay"));
        assert_eq!(PayMethod::from_code(9), None);
    }

    #[test]
    fn test_sku_status_from_str() {
        assert_eq!("online".parse::<SkuStatus>(), Ok(SkuStatus::Online));
        assert_eq!("offline".parse::<SkuStatus>(), Ok(SkuStatus::Offline));
        assert!("deleted".parse::<SkuStatus>().is_err());
    }
}
