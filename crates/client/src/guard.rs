//! Access control for pages that need a signed-in user.

use std::fmt;

use shopfront_core::{OrderId, ProductId, User};

use crate::session::SessionSnapshot;

/// Navigation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Product(ProductId),
    Cart,
    Checkout,
    Orders,
    Order(OrderId),
    Profile,
}

impl Route {
    /// Whether the page needs a signed-in user.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::Checkout | Self::Orders | Self::Order(_) | Self::Profile
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Login => f.write_str("/login"),
            Self::Register => f.write_str("/register"),
            Self::Product(id) => write!(f, "/products/{id}"),
            Self::Cart => f.write_str("/cart"),
            Self::Checkout => f.write_str("/checkout"),
            Self::Orders => f.write_str("/orders"),
            Self::Order(id) => write!(f, "/orders/{id}"),
            Self::Profile => f.write_str("/profile"),
        }
    }
}

/// Decision for a navigation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// The session is still being resolved; show a loading state.
    Pending,
    /// Render the page for this user.
    Granted(User),
    /// Go to `to`, remembering where the user wanted to go.
    Redirect { to: Route, from: Route },
}

/// Decide whether the protected page `requested` may be shown.
#[must_use]
pub fn check(session: &SessionSnapshot, requested: Route) -> Access {
    if session.is_loading {
        return Access::Pending;
    }
    match &session.user {
        Some(user) => Access::Granted(user.clone()),
        None => Access::Redirect {
            to: Route::Login,
            from: requested,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "jane@example.com",
            "username": "jane",
            "is_active": true,
            "is_verified": true,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn snapshot(user: Option<User>, is_loading: bool) -> SessionSnapshot {
        SessionSnapshot {
            user,
            is_loading,
            is_pending: false,
        }
    }

    #[test]
    fn test_pending_while_resolving() {
        assert_eq!(check(&snapshot(None, true), Route::Checkout), Access::Pending);
    }

    #[test]
    fn test_redirects_anonymous_with_origin() {
        assert_eq!(
            check(&snapshot(None, false), Route::Orders),
            Access::Redirect {
                to: Route::Login,
                from: Route::Orders
            }
        );
    }

    #[test]
    fn test_grants_signed_in_user() {
        assert_eq!(
            check(&snapshot(Some(user()), false), Route::Profile),
            Access::Granted(user())
        );
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Order(OrderId::new("o1")).to_string(), "/orders/o1");
        assert_eq!(Route::Home.to_string(), "/");
        assert!(Route::Checkout.is_protected());
        assert!(!Route::Cart.is_protected());
    }
}
