//! Command implementations.

use std::fmt::Display;

use shopfront_client::chat::ChatError;
use shopfront_client::feedback::Feedback;
use shopfront_client::guard::{self, Access, Route};
use shopfront_client::{ApiError, ContextError, Storefront};
use shopfront_core::User;
use thiserror::Error;

use crate::output;

pub mod account;
pub mod assistant;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod upload;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The failure was already shown to the user.
    #[error("command failed")]
    Reported,

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Show the feedback for an operation and turn a failure into
/// [`CliError::Reported`].
fn settle<T, E: Display>(feedback: &Feedback, result: Result<T, E>) -> Result<T, CliError> {
    output::notice(&feedback.notice);
    if let Some(route) = &feedback.navigate {
        tracing::debug!(%route, "Next page");
    }
    result.map_err(|e| {
        tracing::debug!(error = %e, "Operation failed");
        CliError::Reported
    })
}

/// The signed-in user, or a prompt to sign in for `route`.
fn require_user(storefront: &Storefront, route: Route) -> Result<User, CliError> {
    match guard::check(&storefront.session().snapshot(), route) {
        Access::Granted(user) => Ok(user),
        Access::Pending | Access::Redirect { .. } => {
            output::error("Please sign in first: shopfront login -e <email>");
            Err(CliError::Reported)
        }
    }
}
