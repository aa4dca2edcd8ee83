//! Third-party identity providers.
//!
//! A provider runs whatever interactive flow it needs and hands back an
//! opaque credential (an ID token). The session store forwards it to the
//! backend, which verifies it and issues a bearer token.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Why a provider could not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederatedError {
    /// The user abandoned the provider flow.
    #[error("Sign-in was cancelled")]
    Cancelled,

    /// The provider flow failed.
    #[error("{0}")]
    Provider(String),
}

/// Source of federated identity credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FederatedProvider: Send + Sync {
    /// Run the provider flow and return its credential.
    async fn credential(&self) -> Result<SecretString, FederatedError>;
}

/// A credential that was obtained out of band, e.g. pasted into the CLI.
pub struct PresentedCredential {
    credential: Option<SecretString>,
}

impl PresentedCredential {
    #[must_use]
    pub fn new(credential: impl Into<String>) -> Self {
        let credential = credential.into();
        let credential = (!credential.trim().is_empty())
            .then(|| SecretString::from(credential.trim().to_string()));
        Self { credential }
    }
}

#[async_trait]
impl FederatedProvider for PresentedCredential {
    async fn credential(&self) -> Result<SecretString, FederatedError> {
        self.credential.clone().ok_or(FederatedError::Cancelled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn test_presented_credential() {
        let provider = PresentedCredential::new(" id-token ");
        assert_eq!(provider.credential().await.unwrap().expose_secret(), "id-token");
    }

    #[tokio::test]
    async fn test_blank_credential_is_cancelled() {
        let provider = PresentedCredential::new("  ");
        assert_eq!(
            provider.credential().await.unwrap_err(),
            FederatedError::Cancelled
        );
    }
}
