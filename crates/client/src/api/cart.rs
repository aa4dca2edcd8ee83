//! Server-side cart endpoints.
//!
//! The server cart belongs to the signed-in user and is what orders are
//! created from. The local [`CartStore`](crate::cart::CartStore) is mirrored
//! into it at checkout.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopfront_core::{CartItemId, Product, ProductId};
use tracing::instrument;

use super::{ApiClient, ApiError, Auth};

/// A line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CartCount {
    count: u32,
}

impl ApiClient {
    /// Lines of the signed-in user's server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn server_cart(&self) -> Result<Vec<ServerCartItem>, ApiError> {
        let req = self.request(Method::GET, "cart/")?;
        self.send_json(req, Auth::Stored).await
    }

    /// Add `quantity` units of a product. The server merges with an existing
    /// line for the same product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 if stock is insufficient, or
    /// 404 if the product is unknown.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_server_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<ServerCartItem, ApiError> {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        let req = self.request(Method::POST, "cart/")?.json(&body);
        self.send_json(req, Auth::Stored).await
    }

    /// Replace the quantity of a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_item_id = %id))]
    pub async fn update_server_cart_item(
        &self,
        id: &CartItemId,
        quantity: u32,
    ) -> Result<ServerCartItem, ApiError> {
        let path = format!("cart/{}", urlencoding::encode(id.as_str()));
        let req = self
            .request(Method::PUT, &path)?
            .json(&json!({ "quantity": quantity }));
        self.send_json(req, Auth::Stored).await
    }

    /// Remove a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_item_id = %id))]
    pub async fn remove_server_cart_item(&self, id: &CartItemId) -> Result<(), ApiError> {
        let path = format!("cart/{}", urlencoding::encode(id.as_str()));
        let req = self.request(Method::DELETE, &path)?;
        self.send_unit(req, Auth::Stored).await
    }

    /// Empty the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_server_cart(&self) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, "cart/")?;
        self.send_unit(req, Auth::Stored).await
    }

    /// Total units in the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn server_cart_count(&self) -> Result<u32, ApiError> {
        let req = self.request(Method::GET, "cart/count")?;
        let count: CartCount = self.send_json(req, Auth::Stored).await?;
        Ok(count.count)
    }
}
