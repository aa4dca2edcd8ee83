//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for storefront domain concepts and
//! the records exchanged with the storefront API.

pub mod catalog;
pub mod chat;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod status;
pub mod upload;
pub mod user;

pub use catalog::{Category, Product};
pub use chat::ChatMessage;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{checked_line_total, format_amount, line_total};
pub use order::{Address, Order, OrderItem, PaymentIntent};
pub use status::*;
pub use upload::FileUpload;
pub use user::User;
