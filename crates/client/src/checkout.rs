//! Placing an order from the local cart.
//!
//! The backend builds orders from its own copy of the cart, so checkout
//! first replaces the server cart with the local lines, then creates the
//! order and, for card payments, creates and confirms a payment intent.
//!
//! Creating the order consumes the server cart and reserves stock. From that
//! point on the order exists, so the local cart is cleared even if the
//! payment step fails; the failure is reported together with the order.

use shopfront_core::{
    Address, Email, EmailError, Order, OrderStatus, PaymentMethod, PaymentStatus,
};
use thiserror::Error;
use tracing::instrument;

use crate::api::ApiClient;
use crate::api::ApiError;
use crate::api::orders::{NewOrder, PaymentConfirmation};
use crate::cart::{CartStore, CartSummary};
use crate::error::{ErrorKind, add_breadcrumb};
use crate::session::SessionStore;

/// Errors raised while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please sign in to place an order")]
    NotAuthenticated,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    /// The order was created but could not be paid for.
    #[error("Order placed but payment failed: {}", .source.user_message())]
    PaymentFailed {
        order: Box<Order>,
        #[source]
        source: ApiError,
    },
}

impl CheckoutError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated => ErrorKind::Auth,
            Self::EmptyCart | Self::MissingFields(_) | Self::InvalidEmail(_) => {
                ErrorKind::Validation
            }
            Self::Api(e) | Self::PaymentFailed { source: e, .. } => e.kind(),
        }
    }
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: Order,
    /// Present when the order was paid by card.
    pub payment: Option<PaymentConfirmation>,
}

/// Checkout over the context's API client, session and cart.
pub struct Checkout<'a> {
    api: &'a ApiClient,
    session: &'a SessionStore,
    cart: &'a CartStore,
}

impl<'a> Checkout<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, session: &'a SessionStore, cart: &'a CartStore) -> Self {
        Self { api, session, cart }
    }

    /// Totals to show before placing the order.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.cart.summary()
    }

    /// Place an order for everything in the local cart.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::NotAuthenticated` / `EmptyCart` before any request
    /// - `CheckoutError::MissingFields` / `InvalidEmail` for a bad shipping
    ///   or billing address
    /// - `CheckoutError::Api` if syncing the cart or creating the order fails;
    ///   the local cart is untouched
    /// - `CheckoutError::PaymentFailed` if the order exists but payment failed
    #[instrument(skip_all, fields(payment_method = %payment_method))]
    pub async fn place_order(
        &self,
        shipping: Address,
        billing: Address,
        payment_method: PaymentMethod,
    ) -> Result<PlacedOrder, CheckoutError> {
        if !self.session.is_authenticated() {
            return Err(CheckoutError::NotAuthenticated);
        }
        let lines = self.cart.lines();
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        validate_address(&shipping)?;
        validate_address(&billing)?;

        add_breadcrumb("checkout", "Placing order", None);

        self.api.clear_server_cart().await?;
        for line in &lines {
            self.api
                .add_server_cart_item(&line.product_id, line.quantity)
                .await?;
        }

        let mut order = self
            .api
            .create_order(&NewOrder {
                shipping_address: shipping,
                billing_address: billing,
                payment_method,
            })
            .await?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order created");

        self.cart.clear();

        if !payment_method.requires_payment_intent() {
            return Ok(PlacedOrder {
                order,
                payment: None,
            });
        }

        match self.pay(&order).await {
            Ok(confirmation) => {
                order.status = OrderStatus::Confirmed;
                order.payment_status = PaymentStatus::Paid;
                Ok(PlacedOrder {
                    order,
                    payment: Some(confirmation),
                })
            }
            Err(source) => {
                tracing::warn!(order_id = %order.id, error = %source, "Payment failed");
                Err(CheckoutError::PaymentFailed {
                    order: Box::new(order),
                    source,
                })
            }
        }
    }

    async fn pay(&self, order: &Order) -> Result<PaymentConfirmation, ApiError> {
        let intent = self
            .api
            .create_payment_intent(&order.id, order.total_amount)
            .await?;
        self.api
            .confirm_payment(&order.id, &intent.payment_intent_id)
            .await
    }
}

/// Check the fields an order address needs.
///
/// # Errors
///
/// Returns `CheckoutError::MissingFields` listing every blank required
/// field, or `CheckoutError::InvalidEmail`.
pub fn validate_address(address: &Address) -> Result<(), CheckoutError> {
    let missing = address.missing_fields();
    if !missing.is_empty() {
        return Err(CheckoutError::MissingFields(missing));
    }
    Email::parse(&address.email)?;
    Ok(())
}
