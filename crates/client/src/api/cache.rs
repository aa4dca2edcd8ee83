//! Cache types for catalog responses.

use shopfront_core::{Category, Product, ProductId};

/// Cache key for catalog lookups. Search results are never cached.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Categories,
    Featured { limit: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Categories(Vec<Category>),
    Products(Vec<Product>),
}
