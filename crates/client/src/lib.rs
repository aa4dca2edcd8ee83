//! Shopfront client library.
//!
//! Talks to the storefront REST API and keeps the client-side state a
//! shopping front end needs:
//!
//! - [`api`] - Typed endpoint wrappers over a shared HTTP client
//! - [`session`] - Who is signed in, token persistence and re-validation
//! - [`cart`] - The local cart with stock limits and persistence
//! - [`checkout`] - Turning the cart into an order and paying for it
//! - [`chat`] - Shopping assistant conversations
//! - [`guard`] - Access decisions for protected pages
//! - [`feedback`] - User-facing notices for each operation
//!
//! [`context::Storefront`] wires these together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod feedback;
pub mod guard;
pub mod persistence;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use cart::{CartError, CartStore};
pub use config::ClientConfig;
pub use context::{ContextError, Storefront};
pub use error::ErrorKind;
pub use session::{SessionError, SessionStore};
