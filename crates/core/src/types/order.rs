//! Orders, order items, addresses and payment intents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderItemId, OrderStatus, PaymentStatus, Product, ProductId, UserId};

/// A postal address as entered on the checkout form.
///
/// Serialized with camelCase keys, which is the shape the storefront stores
/// inside the order's address columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("zipCode", &self.zip_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// One purchased product inside an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default)]
    pub product: Option<Product>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

impl Order {
    /// Number of units across all items, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.order_items
            .iter()
            .fold(0, |count: u32, item| count.saturating_add(item.quantity))
    }
}

/// Payment intent created for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_uses_camel_case() {
        let address = Address {
            zip_code: "94107".to_string(),
            ..Address::default()
        };
        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json["zipCode"], "94107");
        assert!(json.get("zip_code").is_none());
    }

    #[test]
    fn test_missing_fields() {
        let address = Address {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            address: "1 Market St".to_string(),
            city: " ".to_string(),
            country: "United States".to_string(),
            ..Address::default()
        };
        assert_eq!(address.missing_fields(), vec!["city", "zipCode"]);
    }

    #[test]
    fn test_order_item_count() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "o1",
            "user_id": "u1",
            "total_amount": "30.00",
            "status": "pending",
            "payment_method": "card",
            "payment_status": "pending",
            "shipping_address": {},
            "billing_address": {},
            "created_at": "2024-03-03T10:00:00Z",
            "order_items": [
                {"id": "i1", "product_id": "p1", "quantity": 2, "price": "10.00"},
                {"id": "i2", "product_id": null, "quantity": 1, "price": "10.00"}
            ]
        }))
        .unwrap();
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
