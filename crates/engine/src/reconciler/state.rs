//! Observable cart state and the command/report types around it.

use cart_sync_core::{CartItem, ProductId, ShippingInfo};

/// Snapshot of the cart as seen by readers.
///
/// Only the reconciler writes it; readers get clones via
/// [`CartReconciler::state`](super::CartReconciler::state) or a `watch`
/// receiver from [`CartReconciler::subscribe`](super::CartReconciler::subscribe).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Items in insertion order.
    pub items: Vec<CartItem>,
    /// Shipping address.
    pub shipping_info: ShippingInfo,
    /// A login sync or refresh is in flight.
    pub loading: bool,
    /// `items` equal a trusted read of the remote cart this session.
    pub db_synced: bool,
    /// Last user-visible error, cleared by the next command.
    pub error: Option<String>,
}

impl CartState {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// A user command, for callers that route actions through one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add `quantity` units of a product.
    Add {
        product: ProductId,
        quantity: u32,
    },
    /// Increment a line by one.
    Increase(ProductId),
    /// Decrement a line by one (never below 1).
    Decrease(ProductId),
    /// Set a line to an absolute quantity.
    SetQuantity {
        product: ProductId,
        quantity: u32,
    },
    /// Remove a line.
    Remove(ProductId),
    /// Empty the cart.
    Clear,
    /// Re-read the authoritative remote cart.
    Refresh,
}

/// What the login-triggered sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginSync {
    /// Not authenticated, already synced, or another sync is in flight.
    Skipped,
    /// Guest cart was empty; the remote cart was fetched.
    Fetched,
    /// Guest cart was pushed to the remote and the result re-read.
    Merged(GuestSyncReport),
    /// The remote cart could not be read; local state was kept.
    Unavailable,
}

/// Per-item results of a guest cart sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestSyncReport {
    /// Items the remote accepted, in send order.
    pub accepted: Vec<ProductId>,
    /// Items the remote rejected (404/400); dropped from the cart.
    pub rejected: Vec<ProductId>,
    /// Items whose request failed for other reasons; left to the re-read.
    pub failed: Vec<ProductId>,
    /// Whether the final authoritative re-read succeeded.
    pub synced: bool,
}
