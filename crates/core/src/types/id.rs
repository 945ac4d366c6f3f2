//! Newtype ID for catalog products.
//!
//! Product ids are opaque strings issued by the remote catalog (document ids),
//! so the wrapper only guarantees they are not mixed up with other strings.

use serde::{Deserialize, Serialize};

/// Type-safe reference to a catalog product.
///
/// Serialized transparently as the underlying string.
///
/// # Example
///
/// ```rust
/// # use cart_sync_core::ProductId;
/// let id = ProductId::new("64f1c2a9e4b0a1b2c3d4e5f6");
/// assert_eq!(id.as_str(), "64f1c2a9e4b0a1b2c3d4e5f6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new product ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (never valid on the wire).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ::core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_serializes_transparently() {
        let id = ProductId::new("p-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p-1\"");

        let parsed: ProductId = serde_json::from_str("\"p-2\"").unwrap();
        assert_eq!(parsed, ProductId::from("p-2"));
    }

    #[test]
    fn test_product_id_display() {
        assert_eq!(ProductId::new("abc").to_string(), "abc");
        assert!(ProductId::new("").is_empty());
    }
}
