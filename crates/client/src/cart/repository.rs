use std::collections::HashSet;
use std::sync::Arc;

use crate::persistence::{LocalStore, StorageError, keys};

use super::CartLine;

/// Load/save port for the cart's durable mirror.
pub trait CartRepository: Send + Sync {
    /// Read the saved lines. `Ok(vec![])` when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if saved data cannot be decoded, or
    /// `StorageError::Io` if it cannot be read.
    fn load(&self) -> Result<Vec<CartLine>, StorageError>;

    /// Replace the saved lines.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lines cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError>;
}

/// [`CartRepository`] storing JSON under the `cart` key of a [`LocalStore`].
#[derive(Clone)]
pub struct LocalCartRepository {
    store: Arc<dyn LocalStore>,
}

impl LocalCartRepository {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

impl CartRepository for LocalCartRepository {
    fn load(&self) -> Result<Vec<CartLine>, StorageError> {
        let Some(raw) = self.store.get(keys::CART)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let lines: Vec<CartLine> =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: keys::CART.to_string(),
                message: e.to_string(),
            })?;
        Ok(sanitize(lines))
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(lines).map_err(|e| StorageError::Encode {
            key: keys::CART.to_string(),
            message: e.to_string(),
        })?;
        self.store.set(keys::CART, &raw)
    }
}

/// Restore the cart invariants on data read from storage: one line per
/// product (first wins), and quantity within `1..=stock`.
fn sanitize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| line.quantity > 0 && line.stock > 0)
        .filter(|line| seen.insert(line.product_id.clone()))
        .map(|mut line| {
            line.quantity = line.quantity.min(line.stock);
            line
        })
        .collect()
}
