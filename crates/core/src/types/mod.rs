//! Core types for cart reconciliation.
//!
//! This module provides type-safe wrappers for the cart data model.

pub mod cart;
pub mod id;
pub mod items;
pub mod shipping;

pub use cart::{CartItem, CartResponse, Product};
pub use id::ProductId;
pub use items::{find, merge_quantity, normalize, quantity_of, without};
pub use shipping::ShippingInfo;
