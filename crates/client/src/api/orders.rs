//! Order and payment endpoints.

use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shopfront_core::{Address, Order, OrderId, PaymentIntent, PaymentMethod};
use tracing::instrument;

use super::{ApiClient, ApiError, Auth};

/// Currency every payment intent is created in.
pub const PAYMENT_CURRENCY: &str = "usd";

/// Body of `POST /orders/`. Items come from the server cart.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
}

/// Result of `POST /orders/{id}/confirm-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentConfirmation {
    pub message: String,
    #[serde(default)]
    pub order_status: Option<String>,
}

impl ApiClient {
    /// Orders of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let req = self.request(Method::GET, "orders/")?;
        self.send_json(req, Auth::Stored).await
    }

    /// A single order of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 404 if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{}", urlencoding::encode(id.as_str()));
        let req = self.request(Method::GET, &path)?;
        self.send_json(req, Auth::Stored).await
    }

    /// Create an order from the server cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 if the server cart is empty or
    /// stock ran out.
    #[instrument(skip(self, order), fields(payment_method = %order.payment_method))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        let body = json!({
            "shipping_address": order.shipping_address,
            "billing_address": order.billing_address,
            "payment_method": order.payment_method.to_string(),
        });
        let req = self.request(Method::POST, "orders/")?.json(&body);
        self.send_json(req, Auth::Stored).await
    }

    /// Create a payment intent for `amount` on a pending order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 if the order is not pending.
    #[instrument(skip(self), fields(order_id = %id, amount = %amount))]
    pub async fn create_payment_intent(
        &self,
        id: &OrderId,
        amount: Decimal,
    ) -> Result<PaymentIntent, ApiError> {
        let path = format!("orders/{}/payment-intent", urlencoding::encode(id.as_str()));
        let body = json!({
            "amount": amount,
            "currency": PAYMENT_CURRENCY,
            "order_id": id,
        });
        let req = self.request(Method::POST, &path)?.json(&body);
        self.send_json(req, Auth::Stored).await
    }

    /// Confirm a payment intent, moving the order to paid.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 if the payment did not succeed.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn confirm_payment(
        &self,
        id: &OrderId,
        payment_intent_id: &str,
    ) -> Result<PaymentConfirmation, ApiError> {
        let path = format!(
            "orders/{}/confirm-payment",
            urlencoding::encode(id.as_str())
        );
        let req = self
            .request(Method::POST, &path)?
            .query(&[("payment_intent_id", payment_intent_id)]);
        self.send_json(req, Auth::Stored).await
    }

    /// Cancel a pending or confirmed order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with status 400 if the order can no longer be
    /// cancelled.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<(), ApiError> {
        let path = format!("orders/{}/cancel", urlencoding::encode(id.as_str()));
        let req = self.request(Method::POST, &path)?;
        self.send_unit(req, Auth::Stored).await
    }
}
