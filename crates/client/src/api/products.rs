//! Catalog endpoints.
//!
//! Single products, categories and featured listings are cached; filtered
//! listings and searches always go to the server.

use reqwest::Method;
use shopfront_core::{Category, CategoryId, Product, ProductId};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{ApiClient, ApiError, Auth};

/// Filters for `GET /products/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub featured_only: bool,
}

impl ProductQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = page_params(self.skip, self.limit);
        if let Some(category_id) = &self.category_id {
            params.push(("category_id", category_id.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.trim().to_string()));
        }
        if self.featured_only {
            params.push(("featured_only", "true".to_string()));
        }
        params
    }
}

fn page_params(skip: Option<u32>, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(skip) = skip {
        params.push(("skip", skip.to_string()));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Featured listing size used when the caller does not pick one.
pub const DEFAULT_FEATURED_LIMIT: u32 = 10;

impl ApiClient {
    /// List products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let req = self
            .request(Method::GET, "products/")?
            .query(&query.params());
        self.send_json(req, Auth::Stored).await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 404 if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let req = self.request(Method::GET, &path)?;
        let product: Product = self.send_json(req, Auth::Stored).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List all active categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let req = self.request(Method::GET, "products/categories/")?;
        let categories: Vec<Category> = self.send_json(req, Auth::Stored).await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// List products in a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn products_by_category(
        &self,
        category_id: &CategoryId,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<Product>, ApiError> {
        let path = format!(
            "products/category/{}",
            urlencoding::encode(category_id.as_str())
        );
        let req = self
            .request(Method::GET, &path)?
            .query(&page_params(skip, limit));
        self.send_json(req, Auth::Stored).await
    }

    /// Full-text product search.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 422 if `query` is empty.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<Product>, ApiError> {
        let mut params = vec![("q", query.trim().to_string())];
        params.extend(page_params(skip, limit));
        let req = self.request(Method::GET, "products/search/")?.query(&params);
        self.send_json(req, Auth::Stored).await
    }

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_FEATURED_LIMIT);
        let cache_key = CacheKey::Featured { limit };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let req = self
            .request(Method::GET, "products/featured/")?
            .query(&[("limit", limit)]);
        let products: Vec<Product> = self.send_json(req, Auth::Stored).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }
}
