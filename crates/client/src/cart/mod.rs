//! Cart store: line items, stock limits, derived totals, persistence.
//!
//! # Invariants
//!
//! - At most one line per product, in insertion order
//! - Every line's quantity is in `1..=stock`; a line that would drop to zero
//!   is removed
//! - Totals are recomputed from the lines on every read
//! - Totals always fit their types; a change that would overflow them is
//!   refused
//!
//! The in-memory lines are the source of truth. After each change the whole
//! collection is written through the [`CartRepository`]; a failed write is
//! logged and otherwise ignored.

mod line;
mod repository;

pub use line::{CartLine, NewCartLine};
pub use repository::{CartRepository, LocalCartRepository};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use shopfront_core::ProductId;
use thiserror::Error;

use crate::error::{ErrorKind, add_breadcrumb};
use crate::events::{Listeners, SubscriptionId};

/// Message shown when a quantity would exceed the stock ceiling.
pub const STOCK_LIMIT_MESSAGE: &str = "Cannot add more items. Stock limit reached.";

/// Refusals of cart mutations. The cart is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Cannot add more items. Stock limit reached.")]
    StockLimit { product_id: ProductId, stock: u32 },

    #[error("This product is out of stock")]
    OutOfStock { product_id: ProductId },

    #[error("Cart total is too large")]
    TotalTooLarge { product_id: ProductId },
}

impl CartError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::StockLimit { .. } | Self::OutOfStock { .. } => ErrorKind::StockLimit,
            Self::TotalTooLarge { .. } => ErrorKind::Validation,
        }
    }
}

/// Successful result of [`CartStore::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was created with quantity 1.
    Added,
    /// An existing line went up by one.
    Incremented { quantity: u32 },
}

/// Successful result of [`CartStore::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { quantity: u32 },
    Removed,
    NotInCart,
}

/// Derived totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    pub total_items: u32,
    pub total_price: Decimal,
}

impl CartSummary {
    /// Totals of `lines`, saturating instead of overflowing.
    fn of(lines: &[CartLine]) -> Self {
        lines.iter().fold(Self::default(), |summary, line| Self {
            total_items: summary.total_items.saturating_add(line.quantity),
            total_price: summary.total_price.saturating_add(line.total()),
        })
    }

    /// Totals of `lines`, or `None` if either one overflows.
    fn checked(lines: &[CartLine]) -> Option<Self> {
        lines.iter().try_fold(Self::default(), |summary, line| {
            Some(Self {
                total_items: summary.total_items.checked_add(line.quantity)?,
                total_price: summary.total_price.checked_add(line.checked_total()?)?,
            })
        })
    }
}

/// A change was dropped because the totals would overflow.
struct Overflow;

/// Cart change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    Changed(CartSummary),
}

/// Cart store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    lines: Mutex<Vec<CartLine>>,
    repository: Box<dyn CartRepository>,
    listeners: Listeners<CartEvent>,
}

impl CartStore {
    /// Create the store, hydrated from `repository`. Unreadable or corrupt
    /// saved data starts an empty cart.
    #[must_use]
    pub fn new(repository: Box<dyn CartRepository>) -> Self {
        let mut lines = repository.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable saved cart");
            Vec::new()
        });
        if CartSummary::checked(&lines).is_none() {
            tracing::warn!(lines = lines.len(), "Discarding saved cart with overflowing totals");
            lines.clear();
        }
        tracing::debug!(lines = lines.len(), "Cart loaded");

        Self {
            inner: Arc::new(CartInner {
                lines: Mutex::new(lines),
                repository,
                listeners: Listeners::new(),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<CartLine> {
        self.lock()
            .iter()
            .find(|line| &line.product_id == product_id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.summary().total_items
    }

    /// Sum of unit price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.summary().total_price
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.lock())
    }

    pub fn subscribe(&self, callback: impl Fn(&CartEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of a product.
    ///
    /// The stock ceiling carried by `item` is the current one: it is checked
    /// against the line's quantity and replaces the line's stored ceiling.
    ///
    /// # Errors
    ///
    /// - `CartError::StockLimit` if the line is already at the ceiling
    /// - `CartError::OutOfStock` if the product has no stock at all
    /// - `CartError::TotalTooLarge` if the cart totals would overflow
    pub fn add_item(&self, item: NewCartLine) -> Result<AddOutcome, CartError> {
        let product_id = item.product_id.clone();
        let result = self
            .mutate(|lines| {
                match lines.iter_mut().find(|line| line.product_id == item.product_id) {
                    Some(line) if line.quantity >= item.stock => (
                        Err(CartError::StockLimit {
                            product_id: item.product_id,
                            stock: item.stock,
                        }),
                        false,
                    ),
                    Some(line) => {
                        line.quantity += 1;
                        line.stock = item.stock;
                        (
                            Ok(AddOutcome::Incremented {
                                quantity: line.quantity,
                            }),
                            true,
                        )
                    }
                    None if item.stock == 0 => (
                        Err(CartError::OutOfStock {
                            product_id: item.product_id,
                        }),
                        false,
                    ),
                    None => {
                        lines.push(item.into_line(1));
                        (Ok(AddOutcome::Added), true)
                    }
                }
            })
            .unwrap_or_else(|Overflow| {
                Err(CartError::TotalTooLarge {
                    product_id: product_id.clone(),
                })
            });

        if result.is_ok() {
            add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
        }
        result
    }

    /// Remove a product's line. Returns `false` (and writes nothing) if the
    /// product was not in the cart.
    pub fn remove_item(&self, product_id: &ProductId) -> bool {
        let removed = self
            .mutate(|lines| {
                let before = lines.len();
                lines.retain(|line| &line.product_id != product_id);
                let removed = lines.len() != before;
                (removed, removed)
            })
            .unwrap_or(false);

        if removed {
            add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
        }
        removed
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// - `CartError::StockLimit` if `quantity` exceeds the line's stock
    ///   ceiling
    /// - `CartError::TotalTooLarge` if the cart totals would overflow
    pub fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<UpdateOutcome, CartError> {
        if quantity <= 0 {
            return Ok(if self.remove_item(product_id) {
                UpdateOutcome::Removed
            } else {
                UpdateOutcome::NotInCart
            });
        }

        self.mutate(|lines| {
            let Some(line) = lines.iter_mut().find(|line| &line.product_id == product_id) else {
                return (Ok(UpdateOutcome::NotInCart), false);
            };

            match u32::try_from(quantity) {
                Ok(quantity) if quantity <= line.stock => {
                    let changed = line.quantity != quantity;
                    line.quantity = quantity;
                    (Ok(UpdateOutcome::Updated { quantity }), changed)
                }
                _ => (
                    Err(CartError::StockLimit {
                        product_id: product_id.clone(),
                        stock: line.stock,
                    }),
                    false,
                ),
            }
        })
        .unwrap_or_else(|Overflow| {
            Err(CartError::TotalTooLarge {
                product_id: product_id.clone(),
            })
        })
    }

    /// Remove every line.
    pub fn clear(&self) {
        if self
            .mutate(|lines| {
                lines.clear();
                ((), true)
            })
            .is_ok()
        {
            add_breadcrumb("cart", "Cleared cart", None);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.inner.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the lines under the lock. When it reports
    /// a change and the new totals fit, commit the copy, mirror it to storage
    /// and notify listeners once the lock is released. Otherwise the cart is
    /// left as it was.
    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Vec<CartLine>) -> (R, bool),
    ) -> Result<R, Overflow> {
        let (result, summary) = {
            let mut lines = self.lock();
            let mut next = lines.clone();
            let (result, changed) = change(&mut next);
            if !changed {
                return Ok(result);
            }
            let Some(summary) = CartSummary::checked(&next) else {
                tracing::warn!("Refusing cart change: totals would overflow");
                return Err(Overflow);
            };
            *lines = next;
            if let Err(e) = self.inner.repository.save(&lines) {
                tracing::warn!(error = %e, "Failed to save cart");
            }
            (result, summary)
        };

        self.inner.listeners.notify(&CartEvent::Changed(summary));
        Ok(result)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.len())
            .field("summary", &self.summary())
            .finish_non_exhaustive()
    }
}
