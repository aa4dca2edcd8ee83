//! Newtype IDs for type-safe entity references.
//!
//! The storefront API issues identifiers as opaque strings (UUIDs in practice).
//! The client never parses or generates them, it only compares and echoes
//! them back, so each ID wraps a `String`.
//!
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing IDs from different entity types.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use shopfront_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("a1");
/// let order_id = OrderId::new("a1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// assert_eq!(user_id.as_str(), order_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CategoryId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(ChatMessageId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ProductId::new("9b2f6c1e-0d4a-4c1b-8f5e-2a7d3c9e1b00");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"9b2f6c1e-0d4a-4c1b-8f5e-2a7d3c9e1b00\"");

        let parsed: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_display_and_conversions() {
        let id: OrderId = "ord-1".into();
        assert_eq!(id.to_string(), "ord-1");
        assert_eq!(id.as_str(), "ord-1");
        assert_eq!(id.into_inner(), "ord-1".to_string());
    }
}
