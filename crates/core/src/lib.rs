//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `client` - API client, session and cart stores
//! - `cli` - Command-line storefront
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, statuses and API records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
