//! Storefront REST API client.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per process, cheaply cloneable via `Arc`
//! - Every request made with [`Auth::Stored`] attaches the persisted bearer
//!   token, and a `401` on such a request clears the token and notifies the
//!   [`Unauthorized`] listeners. This is the only place unauthorized
//!   responses are handled.
//! - Catalog reads are cached in memory via `moka`
//!
//! # Endpoint groups
//!
//! - [`auth`] - login, registration, federated login, identity
//! - [`products`] - catalog
//! - [`cart`] - server-side cart
//! - [`orders`] - orders and payments
//! - [`chat`] - shopping assistant
//! - [`upload`] - file uploads

pub mod auth;
mod cache;
pub mod cart;
pub mod chat;
pub mod orders;
pub mod products;
pub mod upload;

pub use auth::{AuthApi, LoginRequest, RegisterRequest, TokenResponse};

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ErrorKind, NETWORK_ERROR_MESSAGE};
use crate::events::{Listeners, SubscriptionId};
use crate::session::TokenStore;

use cache::{CacheKey, CacheValue};

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    /// A request made with the stored token was rejected. The token has
    /// already been cleared.
    #[error("Unauthorized: session expired")]
    Unauthorized,

    /// A success response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A request part could not be built (e.g. an invalid MIME type).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Classify this error into the storefront taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Auth,
            Self::Api { status, .. } => match *status {
                401 | 403 => ErrorKind::Auth,
                404 => ErrorKind::NotFound,
                400..=499 => ErrorKind::Validation,
                _ => ErrorKind::Network,
            },
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => ErrorKind::Network,
        }
    }

    /// The server-provided `detail` message, if the server sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// Message to show the user: the server's explanation for rejected
    /// requests, a generic one for everything else.
    #[must_use]
    pub fn user_message(&self) -> String {
        match (self.kind(), self.detail()) {
            (ErrorKind::Network, _) => NETWORK_ERROR_MESSAGE.to_string(),
            (_, Some(detail)) => detail.to_string(),
            (ErrorKind::Auth, None) => "Session expired. Please sign in again.".to_string(),
            (_, None) => "Request failed".to_string(),
        }
    }

    /// HTTP status of the response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Event published when a request made with the stored token gets a `401`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

/// How a request is authorized.
#[derive(Clone, Copy)]
pub(crate) enum Auth<'a> {
    /// No `Authorization` header (login, registration).
    Anonymous,
    /// The persisted token, when one exists. Subject to the unauthorized
    /// interceptor.
    Stored,
    /// An explicit token that is not (yet) the persisted one. Used to
    /// validate a token before adopting it; a `401` is reported to the caller
    /// only.
    Bearer(&'a SecretString),
}

/// Client for the storefront REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: TokenStore,
    unauthorized: Listeners<Unauthorized>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, token: TokenStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                token,
                unauthorized: Listeners::new(),
                cache,
            }),
        })
    }

    /// Base URL every endpoint path is joined to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The token store consulted by [`Auth::Stored`] requests.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.inner.token
    }

    /// Register a callback for unauthorized responses.
    pub fn on_unauthorized(
        &self,
        callback: impl Fn(&Unauthorized) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.unauthorized.subscribe(callback)
    }

    /// Drop every cached catalog response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Build a request for `path`, relative to the base URL.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and return the raw body of a success response.
    async fn execute(&self, request: RequestBuilder, auth: Auth<'_>) -> Result<String, ApiError> {
        let (request, intercept) = match auth {
            Auth::Anonymous => (request, false),
            Auth::Stored => match self.inner.token.load() {
                Some(token) => (request.bearer_auth(token.expose_secret()), true),
                None => (request, true),
            },
            Auth::Bearer(token) => (request.bearer_auth(token.expose_secret()), false),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED && intercept {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Storefront API returned non-success status"
            );
            let detail = extract_detail(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(body)
    }

    /// Send a request and decode a JSON success body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        auth: Auth<'_>,
    ) -> Result<T, ApiError> {
        let body = self.execute(request, auth).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse storefront API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose success body carries nothing the caller needs.
    async fn send_unit(&self, request: RequestBuilder, auth: Auth<'_>) -> Result<(), ApiError> {
        self.execute(request, auth).await.map(drop)
    }

    /// Clear the stored token and tell every subscriber.
    fn handle_unauthorized(&self) {
        tracing::info!("Unauthorized response, clearing stored token");
        if let Err(e) = self.inner.token.clear() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
        self.inner.unauthorized.notify(&Unauthorized);
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// `{"detail": [{"msg": "..."}]}`, and `{"detail": {"error": "..."}}` /
/// `{"error": "..."}`.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let message = match value.get("detail") {
        Some(serde_json::Value::String(detail)) => Some(detail.clone()),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Some(detail @ serde_json::Value::Object(_)) => detail
            .get("error")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        _ => value
            .get("error")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
    };

    message.filter(|m| !m.trim().is_empty())
}
