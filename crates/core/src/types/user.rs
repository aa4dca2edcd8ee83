//! The authenticated user record returned by `GET /auth/me`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A storefront account.
///
/// `email` is kept as the raw string the server returned; the server has
/// already validated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(default)]
    pub is_google_user: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to greet the user with: full name when set, username otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "5f0c2d4e-1111-4a2b-9c3d-000000000001",
            "email": "jane@example.com",
            "username": "jane",
            "full_name": null,
            "is_active": true,
            "is_verified": false,
            "is_google_user": false,
            "created_at": "2024-05-01T12:30:00Z"
        })
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let user: User = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(user.username, "jane");
        assert!(user.avatar_url.is_none());
        assert_eq!(user.display_name(), "jane");
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut value = sample_json();
        value["full_name"] = serde_json::json!("Jane Doe");
        let user: User = serde_json::from_value(value).unwrap();
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        let mut value = sample_json();
        value.as_object_mut().unwrap().remove("id");
        assert!(serde_json::from_value::<User>(value).is_err());
    }
}
