//! User-facing notifications for store operations.
//!
//! Each function takes the result of one operation and returns exactly one
//! [`Notice`], plus where to navigate next when the operation implies it.

use shopfront_core::User;

use crate::cart::{AddOutcome, CartError, UpdateOutcome};
use crate::checkout::{CheckoutError, PlacedOrder};
use crate::guard::Route;
use crate::session::SessionError;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A message to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// What to tell the user and where to go after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub notice: Notice,
    pub navigate: Option<Route>,
}

impl Feedback {
    fn stay(notice: Notice) -> Self {
        Self {
            notice,
            navigate: None,
        }
    }

    fn go(notice: Notice, route: Route) -> Self {
        Self {
            notice,
            navigate: Some(route),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

#[must_use]
pub fn login(result: &Result<User, SessionError>) -> Feedback {
    match result {
        Ok(_) => Feedback::go(Notice::success("Welcome back!"), Route::Home),
        Err(e) => Feedback::stay(Notice::error(e.to_string())),
    }
}

#[must_use]
pub fn register(result: &Result<User, SessionError>) -> Feedback {
    match result {
        Ok(_) => Feedback::go(Notice::success("Account created successfully!"), Route::Home),
        Err(e) => Feedback::stay(Notice::error(e.to_string())),
    }
}

#[must_use]
pub fn federated_login(result: &Result<User, SessionError>) -> Feedback {
    login(result)
}

#[must_use]
pub fn logout() -> Feedback {
    Feedback::go(Notice::success("Logged out successfully"), Route::Login)
}

/// The session ended because the server rejected the token.
#[must_use]
pub fn session_expired() -> Feedback {
    Feedback::go(
        Notice::error("Your session has expired. Please sign in again."),
        Route::Login,
    )
}

// =============================================================================
// Cart
// =============================================================================

#[must_use]
pub fn add_item(result: &Result<AddOutcome, CartError>) -> Feedback {
    Feedback::stay(match result {
        Ok(AddOutcome::Added) => Notice::success("Item added to cart!"),
        Ok(AddOutcome::Incremented { .. }) => Notice::success("Item quantity updated!"),
        Err(e) => Notice::error(e.to_string()),
    })
}

#[must_use]
pub fn remove_item() -> Feedback {
    Feedback::stay(Notice::success("Item removed from cart"))
}

#[must_use]
pub fn update_quantity(result: &Result<UpdateOutcome, CartError>) -> Feedback {
    Feedback::stay(match result {
        Ok(UpdateOutcome::Updated { .. }) => Notice::success("Item quantity updated!"),
        Ok(UpdateOutcome::Removed) => Notice::success("Item removed from cart"),
        Ok(UpdateOutcome::NotInCart) => Notice::error("Item is not in your cart"),
        Err(e) => Notice::error(e.to_string()),
    })
}

#[must_use]
pub fn clear_cart() -> Feedback {
    Feedback::stay(Notice::success("Cart cleared"))
}

// =============================================================================
// Checkout
// =============================================================================

#[must_use]
pub fn checkout(result: &Result<PlacedOrder, CheckoutError>) -> Feedback {
    match result {
        Ok(placed) => Feedback::go(
            Notice::success("Order placed successfully!"),
            Route::Order(placed.order.id.clone()),
        ),
        Err(CheckoutError::NotAuthenticated) => Feedback::go(
            Notice::error(CheckoutError::NotAuthenticated.to_string()),
            Route::Login,
        ),
        Err(CheckoutError::EmptyCart) => Feedback::go(
            Notice::error(CheckoutError::EmptyCart.to_string()),
            Route::Cart,
        ),
        Err(e @ CheckoutError::PaymentFailed { order, .. }) => {
            Feedback::go(Notice::error(e.to_string()), Route::Order(order.id.clone()))
        }
        Err(e) => Feedback::stay(Notice::error(e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::ProductId;

    use super::*;
    use crate::error::NETWORK_ERROR_MESSAGE;

    #[test]
    fn test_login_failure_keeps_server_message() {
        let result = Err(SessionError::InvalidCredentials("Invalid credentials".to_string()));
        let feedback = login(&result);
        assert_eq!(feedback.notice, Notice::error("Invalid credentials"));
        assert_eq!(feedback.navigate, None);
    }

    #[test]
    fn test_network_failure_message() {
        let result = Err(SessionError::Network(NETWORK_ERROR_MESSAGE.to_string()));
        assert_eq!(
            register(&result).notice.message,
            "Network error. Please try again."
        );
    }

    #[test]
    fn test_registered_but_login_failed() {
        let result = Err(SessionError::RegisteredButLoginFailed("x".to_string()));
        assert_eq!(
            register(&result).notice,
            Notice::error("Registration successful but login failed")
        );
    }

    #[test]
    fn test_logout_goes_to_login() {
        let feedback = logout();
        assert_eq!(feedback.notice, Notice::success("Logged out successfully"));
        assert_eq!(feedback.navigate, Some(Route::Login));
    }

    #[test]
    fn test_cart_messages() {
        assert_eq!(
            add_item(&Ok(AddOutcome::Added)).notice.message,
            "Item added to cart!"
        );
        assert_eq!(
            add_item(&Ok(AddOutcome::Incremented { quantity: 2 }))
                .notice
                .message,
            "Item quantity updated!"
        );
        let limit = Err(CartError::StockLimit {
            product_id: ProductId::new("p1"),
            stock: 2,
        });
        assert_eq!(
            add_item(&limit).notice,
            Notice::error("Cannot add more items. Stock limit reached.")
        );
        assert_eq!(
            update_quantity(&Ok(UpdateOutcome::Removed)).notice.message,
            "Item removed from cart"
        );
        assert_eq!(clear_cart().notice.message, "Cart cleared");
    }

    #[test]
    fn test_checkout_empty_cart_goes_to_cart() {
        let feedback = checkout(&Err(CheckoutError::EmptyCart));
        assert_eq!(feedback.navigate, Some(Route::Cart));
        assert_eq!(feedback.notice.level, Level::Error);
    }
}
