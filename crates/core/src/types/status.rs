//! Status enums for orders and payments.
//!
//! The API stores statuses as lowercase strings. Values this client does not
//! know about deserialize to `Other` instead of failing the whole order.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl OrderStatus {
    /// Whether the backend still accepts a cancellation for this order.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Whether the method goes through a payment intent.
    #[must_use]
    pub const fn requires_payment_intent(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::CashOnDelivery => write!(f, "cash_on_delivery"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash_on_delivery" | "cod" => Ok(Self::CashOnDelivery),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status_roundtrip() {
        let status: OrderStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(status, OrderStatus::Confirmed);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"confirmed\"");
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: OrderStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, OrderStatus::Other("on_hold".to_string()));
        assert_eq!(status.to_string(), "on_hold");
        assert!(!status.is_cancellable());
    }

    #[test]
    fn test_cancellable_statuses() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Confirmed.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "cod".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::CashOnDelivery
        );
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert!(!PaymentMethod::CashOnDelivery.requires_payment_intent());
    }
}
