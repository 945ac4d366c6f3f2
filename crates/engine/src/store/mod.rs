//! Durable local cart snapshot.
//!
//! The local store holds two independent JSON blobs: the cart items array and
//! the shipping info object. Both are always overwritten wholesale; nothing is
//! patched in place. Loading never fails: missing or corrupt data yields an
//! empty cart (or default shipping info) and a warning in the log.
//!
//! Where the blobs live is abstracted behind [`SnapshotStorage`]:
//! - [`FileStorage`] - one file per key under a directory
//! - [`MemoryStorage`] - in-process map, for tests and ephemeral sessions

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use cart_sync_core::{CartItem, ShippingInfo, normalize};
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key of the cart items snapshot.
pub const CART_ITEMS_KEY: &str = "cartItems";
/// Storage key of the shipping info snapshot.
pub const SHIPPING_INFO_KEY: &str = "shippingInfo";

/// Errors writing a local snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded.
    #[error("Snapshot encode error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw key/value storage for snapshot blobs.
pub trait SnapshotStorage: Send + Sync {
    /// Read the blob stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Replace the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the blob cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the blob stored under `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the blob exists but cannot be removed.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Typed access to the local cart and shipping snapshots.
///
/// Cheaply cloneable; clones share the same underlying storage.
#[derive(Clone)]
pub struct LocalCartStore {
    storage: Arc<dyn SnapshotStorage>,
}

impl std::fmt::Debug for LocalCartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCartStore").finish_non_exhaustive()
    }
}

impl LocalCartStore {
    /// Create a store over the given storage backend.
    #[must_use]
    pub fn new(storage: impl SnapshotStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Create a store backed by a fresh in-memory map.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Load the cart items snapshot.
    ///
    /// Missing or corrupt data yields an empty list. Duplicate lines are
    /// coalesced so the one-line-per-product invariant holds on load.
    #[must_use]
    pub fn load_items(&self) -> Vec<CartItem> {
        let Some(raw) = self.storage.read(CART_ITEMS_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(items) => normalize(items),
            Err(e) => {
                warn!(error = %e, "Corrupt cart snapshot, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the cart items snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be encoded or written.
    pub fn save_items(&self, items: &[CartItem]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.storage.write(CART_ITEMS_KEY, &raw)?;
        debug!(count = items.len(), "Cart snapshot saved");
        Ok(())
    }

    /// Delete the cart items snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the snapshot cannot be removed.
    pub fn clear_items(&self) -> Result<(), StoreError> {
        self.storage.remove(CART_ITEMS_KEY)
    }

    /// Load the shipping info snapshot, or defaults if missing or corrupt.
    #[must_use]
    pub fn load_shipping(&self) -> ShippingInfo {
        let Some(raw) = self.storage.read(SHIPPING_INFO_KEY) else {
            return ShippingInfo::default();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Corrupt shipping snapshot, using defaults");
            ShippingInfo::default()
        })
    }

    /// Replace the shipping info snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be encoded or written.
    pub fn save_shipping(&self, info: &ShippingInfo) -> Result<(), StoreError> {
        let raw = serde_json::to_string(info)?;
        self.storage.write(SHIPPING_INFO_KEY, &raw)
    }
}
