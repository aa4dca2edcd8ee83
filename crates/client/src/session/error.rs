use thiserror::Error;

use crate::api::ApiError;
use crate::error::{ErrorKind, NETWORK_ERROR_MESSAGE};
use crate::persistence::StorageError;

/// Message when a login is refused without a server explanation.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// Message when a registration is refused without a server explanation.
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";

/// Errors raised by session operations.
///
/// The display text of every variant is the message shown to the user.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server rejected the credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The server rejected the submitted data.
    #[error("{0}")]
    Validation(String),

    /// The server could not be reached or answered unusably.
    #[error("{0}")]
    Network(String),

    /// The issued token was not accepted by the identity endpoint.
    #[error("Session expired. Please sign in again.")]
    TokenInvalid,

    /// The account was created but signing in with it failed.
    #[error("Registration successful but login failed")]
    RegisteredButLoginFailed(String),

    /// The federated provider could not produce a credential.
    #[error("{0}")]
    Federated(String),

    /// Another sign-in is still in flight.
    #[error("Please wait, a sign-in is already in progress")]
    Busy,

    /// The token could not be persisted.
    #[error("Could not save session: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Classify this error into the storefront taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials(_)
            | Self::TokenInvalid
            | Self::RegisteredButLoginFailed(_)
            | Self::Federated(_) => ErrorKind::Auth,
            Self::Validation(_) | Self::Busy => ErrorKind::Validation,
            Self::Network(_) | Self::Storage(_) => ErrorKind::Network,
        }
    }

    /// Convert an API failure of a credential submission, using `fallback`
    /// when the server gave no reason.
    pub(crate) fn from_api(err: ApiError, fallback: &str) -> Self {
        let message = || err.detail().unwrap_or(fallback).to_string();
        match err.kind() {
            ErrorKind::Auth if matches!(err, ApiError::Unauthorized) => Self::TokenInvalid,
            ErrorKind::Auth => Self::InvalidCredentials(message()),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::StockLimit => {
                Self::Validation(message())
            }
            ErrorKind::Network => Self::Network(NETWORK_ERROR_MESSAGE.to_string()),
        }
    }
}
