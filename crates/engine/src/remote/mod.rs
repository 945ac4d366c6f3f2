//! Remote cart API and catalog lookup.
//!
//! # Architecture
//!
//! - [`CartApi`] is the seam the reconciler talks to; [`HttpCartClient`] is
//!   the production implementation (JSON over HTTPS, bearer credential from
//!   the [`Session`](crate::session::Session) on every call)
//! - [`Catalog`] resolves product snapshots; [`HttpCatalog`] caches
//!   successful lookups in memory via `moka`
//! - Server payloads are loosely typed; they are validated and normalized
//!   into `cart_sync_core` types at this boundary (see `wire`)
//!
//! # Endpoints
//!
//! - `GET /cart` - authoritative cart
//! - `POST /cart/add { productId, quantity }` - store `quantity` as the line total, returns the cart
//! - `PUT /cart/increase/{productId}`, `PUT /cart/decrease/{productId}`
//! - `DELETE /cart/remove/{productId}`, `DELETE /cart/clear`
//! - `POST /cart/shipping { address fields }`
//! - `GET /product/{id}` - catalog

mod catalog;
mod http;
mod wire;

pub use catalog::{Catalog, HttpCatalog};
pub use http::HttpCartClient;

use async_trait::async_trait;
use cart_sync_core::{CartResponse, ProductId, ShippingInfo};
use thiserror::Error;

/// Failure classes surfaced by the remote cart API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// 404: the product (or cart line) no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400: the server rejected the request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Transport failure or any other status.
    #[error("Network or server error: {0}")]
    NetworkOrServer(String),
}

impl RemoteError {
    /// Whether the failure means the item itself is bad (pruned during sync)
    /// rather than the remote being unavailable.
    #[must_use]
    pub const fn is_item_rejected(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::BadRequest(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkOrServer(err.to_string())
    }
}

/// Operations on the authenticated user's remote cart.
///
/// Write operations that return the cart give back the server's full view
/// after the write; callers still re-read with [`CartApi::fetch_cart`] when
/// they need an authoritative snapshot.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Read the authoritative cart.
    async fn fetch_cart(&self) -> Result<CartResponse, RemoteError>;

    /// Add `quantity` units of `product`.
    ///
    /// Additive: an existing line grows by `quantity`, a missing one is
    /// created with `quantity` units.
    async fn add_item(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError>;

    /// Set the line for `product` to exactly `quantity` units.
    async fn set_quantity(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError>;

    /// Increment the line for `product` by one.
    async fn increase(&self, product: &ProductId) -> Result<(), RemoteError>;

    /// Decrement the line for `product` by one.
    async fn decrease(&self, product: &ProductId) -> Result<(), RemoteError>;

    /// Delete the line for `product`.
    async fn remove_item(&self, product: &ProductId) -> Result<(), RemoteError>;

    /// Delete every line.
    async fn clear(&self) -> Result<(), RemoteError>;

    /// Replace the shipping info stored with the cart.
    async fn set_shipping(&self, info: &ShippingInfo) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::NotFound("product p1".to_string());
        assert_eq!(err.to_string(), "Not found: product p1");
    }

    #[test]
    fn test_item_rejected_classes() {
        assert!(RemoteError::NotFound(String::new()).is_item_rejected());
        assert!(RemoteError::BadRequest(String::new()).is_item_rejected());
        assert!(!RemoteError::NetworkOrServer(String::new()).is_item_rejected());
    }
}
