//! Error classification shared by every store and API wrapper, plus the
//! Sentry helpers used to attach user context and breadcrumbs.
//!
//! Each layer has its own `thiserror` enum; all of them classify into an
//! [`ErrorKind`] so callers can decide how to present a failure without
//! matching on every variant.

use std::fmt;

/// The storefront's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, shown inline or as a message.
    Validation,
    /// Invalid credentials or an expired token. Clears the session.
    Auth,
    /// Recoverable refusal to exceed a product's stock. No state change.
    StockLimit,
    /// Transport failure or unusable response. No state change.
    Network,
    /// Missing product, order or other resource.
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::StockLimit => "stock_limit",
            Self::Network => "network",
            Self::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// Message shown for every transport failure.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::StockLimit.to_string(), "stock_limit");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_sentry_helpers_without_client() {
        // With no Sentry client bound these are no-ops and must not panic.
        set_sentry_user(&"user-1", Some("jane@example.com"));
        add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
        clear_sentry_user();
    }
}
