//! Authentication endpoints.
//!
//! The [`AuthApi`] trait is the port the session store talks to, so session
//! flows can be tested against a mock without a server.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use shopfront_core::User;
use tracing::instrument;

use super::{ApiClient, ApiError, Auth};

/// Credentials submitted to `POST /auth/login`.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

/// Account details submitted to `POST /auth/register`.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub full_name: String,
}

/// Bearer token issued by the login endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Identity operations used by the session store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError>;

    /// Create an account. Does not sign in.
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;

    /// Exchange a federated identity credential for a bearer token.
    async fn google(&self, credential: &SecretString) -> Result<TokenResponse, ApiError>;

    /// Fetch the user a token belongs to.
    async fn me(&self, token: &SecretString) -> Result<User, ApiError>;
}

#[async_trait]
impl AuthApi for ApiClient {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        let body = json!({
            "email": request.email,
            "password": request.password.expose_secret(),
        });
        let req = self.request(Method::POST, "auth/login")?.json(&body);
        self.send_json(req, Auth::Anonymous).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let body = json!({
            "username": request.username,
            "email": request.email,
            "password": request.password.expose_secret(),
            "full_name": request.full_name,
        });
        let req = self.request(Method::POST, "auth/register")?.json(&body);
        self.send_json(req, Auth::Anonymous).await
    }

    #[instrument(skip_all)]
    async fn google(&self, credential: &SecretString) -> Result<TokenResponse, ApiError> {
        let body = json!({ "token": credential.expose_secret() });
        let req = self.request(Method::POST, "auth/google")?.json(&body);
        self.send_json(req, Auth::Anonymous).await
    }

    #[instrument(skip_all)]
    async fn me(&self, token: &SecretString) -> Result<User, ApiError> {
        let req = self.request(Method::GET, "auth/me")?;
        self.send_json(req, Auth::Bearer(token)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_defaults_type() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(token.access_token.expose_secret(), "abc");
        assert_eq!(token.token_type, "bearer");
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let request = LoginRequest {
            email: "jane@example.com".to_string(),
            password: SecretString::from("hunter2".to_string()),
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
