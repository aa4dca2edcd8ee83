//! Catalog records: products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A product as listed by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl Product {
    /// Price actually charged: the discount price when one is set.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Stock available to a cart, clamped to zero for negative counts.
    #[must_use]
    pub fn available_stock(&self) -> u32 {
        u32::try_from(self.stock_quantity.max(0)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// First product image, used as the cart thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}
