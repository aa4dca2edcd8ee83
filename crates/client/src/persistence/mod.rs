//! Durable client state.
//!
//! [`LocalStore`] is the port every persisted value goes through: a small
//! string key/value store in the spirit of browser local storage. Adapters:
//!
//! - [`FileStore`] - one file per key under the configured data directory
//! - [`MemoryStore`] - process-local map, used in tests and ephemeral runs
//!
//! Only two keys are ever written, see [`keys`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Keys for persisted client state.
pub mod keys {
    /// Bearer token of the current session.
    pub const TOKEN: &str = "token";

    /// Serialized cart lines.
    pub const CART: &str = "cart";
}

/// Errors raised by persistence adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded.
    #[error("stored value under '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// A value could not be encoded for storage.
    #[error("could not encode value for '{key}': {message}")]
    Encode { key: String, message: String },

    /// The key cannot be stored by this adapter.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key/value storage for client state.
pub trait LocalStore: Send + Sync {
    /// Read the value under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Keys are restricted so they can be used as file names.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
