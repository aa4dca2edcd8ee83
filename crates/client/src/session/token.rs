use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::persistence::{LocalStore, StorageError, keys};

/// The persisted bearer token.
///
/// Shared by the API client (which attaches it to requests and clears it on
/// `401`) and the session store (which saves it after login).
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn LocalStore>,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// The stored token, if any. Read failures and blank values count as
    /// no token.
    #[must_use]
    pub fn load(&self) -> Option<SecretString> {
        match self.store.get(keys::TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                Some(SecretString::from(token.trim().to_string()))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the token cannot be written.
    pub fn save(&self, token: &SecretString) -> Result<(), StorageError> {
        self.store.set(keys::TOKEN, token.expose_secret())
    }

    /// Remove the stored token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the token cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(keys::TOKEN)
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.load().is_some()
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("present", &self.is_present())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_save_load_clear() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        assert!(tokens.load().is_none());

        tokens.save(&SecretString::from("abc".to_string())).unwrap();
        assert_eq!(tokens.load().unwrap().expose_secret(), "abc");

        tokens.clear().unwrap();
        assert!(!tokens.is_present());
    }

    #[test]
    fn test_blank_token_is_absent() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::with_entries([("token", "  ")])));
        assert!(tokens.load().is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::with_entries([("token", "secret")])));
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("present: true"));
    }
}
