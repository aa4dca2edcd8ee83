//! The storefront context shared by every screen.

use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::cart::{CartStore, LocalCartRepository};
use crate::chat::ChatSession;
use crate::checkout::Checkout;
use crate::config::ClientConfig;
use crate::persistence::{FileStore, LocalStore, StorageError};
use crate::session::{SessionStore, TokenStore};

/// Errors creating a [`Storefront`].
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("could not open data directory: {0}")]
    Storage(#[from] StorageError),
    #[error("could not build API client: {0}")]
    Api(#[from] ApiError),
}

/// API client, session and cart wired together.
///
/// Cheaply cloneable. A `401` seen by the API client signs the session out.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    api: ApiClient,
    session: SessionStore,
    cart: CartStore,
}

impl Storefront {
    /// Create a context persisting its state under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if the data directory cannot be created or the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ContextError> {
        let store = FileStore::open(&config.data_dir)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Create a context over an arbitrary store.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Api` if the HTTP client cannot be built.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self, ContextError> {
        let tokens = TokenStore::new(Arc::clone(&store));
        let api = ApiClient::new(&config, tokens.clone())?;
        let session = SessionStore::new(Arc::new(api.clone()), tokens);
        api.on_unauthorized(session.unauthorized_handler());
        let cart = CartStore::new(Box::new(LocalCartRepository::new(store)));

        tracing::debug!(api_url = %config.api_url, "Storefront context ready");

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                session,
                cart,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Checkout over this context's cart and session.
    #[must_use]
    pub fn checkout(&self) -> Checkout<'_> {
        Checkout::new(&self.inner.api, &self.inner.session, &self.inner.cart)
    }

    /// Start a new assistant conversation.
    #[must_use]
    pub fn chat(&self) -> ChatSession {
        ChatSession::new(self.inner.api.clone())
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("data_dir", &self.inner.config.data_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, keys};

    #[tokio::test]
    async fn test_startup_without_token_resolves_anonymous() {
        let config = ClientConfig::for_api_url("http://127.0.0.1:9").unwrap();
        let storefront =
            Storefront::with_store(config, Arc::new(MemoryStore::new())).unwrap();

        assert!(storefront.session().is_loading());
        assert_eq!(storefront.session().initialize().await, None);
        assert!(!storefront.session().is_loading());
        assert!(storefront.cart().is_empty());
    }

    #[test]
    fn test_restores_saved_cart() {
        let cart = r#"[{"id":"p1","name":"Mug","price":"12.50","quantity":2,"stock":5}]"#;
        let store = MemoryStore::with_entries([(keys::CART, cart)]);
        let config = ClientConfig::for_api_url("http://127.0.0.1:9").unwrap();
        let storefront = Storefront::with_store(config, Arc::new(store)).unwrap();

        assert_eq!(storefront.cart().total_items(), 2);
    }

    #[test]
    fn test_file_backed_context() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::for_api_url("http://127.0.0.1:9")
            .unwrap()
            .with_data_dir(dir.path().join("state"));
        let storefront = Storefront::new(config).unwrap();
        assert!(dir.path().join("state").is_dir());
        assert!(!storefront.api().token_store().is_present());
    }
}
