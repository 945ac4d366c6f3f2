//! Caller-facing command outcomes.
//!
//! Every reconciler command returns a [`CartOutcome`]: the resulting items on
//! success, or a [`CartFailure`] carrying a human-readable message. Failures
//! intentionally carry no structured code; presenting them (toast, log line,
//! exit status) is the caller's job.

use cart_sync_core::CartItem;
use thiserror::Error;

/// Message shown when an added product has disappeared from the catalog.
pub const PRODUCT_UNAVAILABLE: &str = "Product no longer available";

/// A user-visible command failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CartFailure {
    /// Human-readable description.
    pub message: String,
}

impl CartFailure {
    /// Create a failure with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The product could not be resolved in the catalog.
    #[must_use]
    pub fn product_unavailable() -> Self {
        Self::new(PRODUCT_UNAVAILABLE)
    }
}

/// Result of a cart command: the items after the command, or a failure.
pub type CartOutcome = std::result::Result<Vec<CartItem>, CartFailure>;
