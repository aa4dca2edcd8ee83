use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopfront_core::{Product, ProductId, checked_line_total, line_total};

/// One product in the cart.
///
/// Serialized with the keys the cart has always been stored under
/// (`id`, `price`, `stock`), so carts written by earlier versions load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    pub stock: u32,
}

impl CartLine {
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }

    /// Line total, or `None` if it overflows.
    #[must_use]
    pub fn checked_total(&self) -> Option<Decimal> {
        checked_line_total(self.unit_price, self.quantity)
    }
}

/// A product about to be added: a cart line without a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub stock: u32,
}

impl NewCartLine {
    /// Cart entry for a catalog product at its effective price.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.effective_price(),
            image: product.primary_image().map(String::from),
            stock: product.available_stock(),
        }
    }

    pub(crate) fn into_line(self, quantity: u32) -> CartLine {
        CartLine {
            product_id: self.product_id,
            name: self.name,
            unit_price: self.unit_price,
            quantity,
            image: self.image,
            stock: self.stock,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_keeps_stored_shape() {
        let json = r#"{"id":"p1","name":"Mug","price":"12.50","quantity":2,"image":"m.png","stock":5}"#;
        let line: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.product_id.as_str(), "p1");
        assert_eq!(line.total(), Decimal::new(2500, 2));

        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["id"], "p1");
        assert!(value.get("product_id").is_none());
    }

    #[test]
    fn test_line_accepts_numeric_price() {
        let json = r#"{"id":"p1","name":"Mug","price":9.99,"quantity":1,"stock":3}"#;
        let line: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.unit_price, Decimal::new(999, 2));
        assert_eq!(line.image, None);
    }

    #[test]
    fn test_from_product_uses_effective_price() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Mug",
            "price": "20.00",
            "discount_price": "15.00",
            "image_urls": ["a.png", "b.png"],
            "stock_quantity": 4,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        let line = NewCartLine::from_product(&product);
        assert_eq!(line.unit_price, Decimal::new(1500, 2));
        assert_eq!(line.image.as_deref(), Some("a.png"));
        assert_eq!(line.stock, 4);
    }
}
