//! Cart line items and the authoritative remote cart shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::shipping::ShippingInfo;

// =============================================================================
// Cart Items
// =============================================================================

/// A single product line in a cart.
///
/// Product details are denormalized at add time so the cart can be rendered
/// without a catalog round trip. At most one item per `product` exists in a
/// cart; `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog product this line refers to.
    pub product: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Primary image URL.
    #[serde(default)]
    pub image: String,
    /// Units in stock when last seen. The UI keeps `quantity <= stock`.
    #[serde(default)]
    pub stock: u32,
    /// Number of units in the cart.
    pub quantity: u32,
}

impl CartItem {
    /// Line total (`price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// Product details resolved from the catalog when adding to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Decimal,
    /// Primary image URL (empty if the product has no images).
    pub image: String,
    /// Units currently in stock.
    pub stock: u32,
}

impl Product {
    /// Build a new cart line for this product.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            product: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            stock: self.stock,
            quantity,
        }
    }
}

// =============================================================================
// Remote Cart
// =============================================================================

/// The authoritative cart as returned by the remote cart API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartResponse {
    /// Items in server order.
    pub items: Vec<CartItem>,
    /// Shipping info stored with the cart, if any.
    pub shipping_info: Option<ShippingInfo>,
}
