//! Cart Sync Core - Shared cart types.
//!
//! This crate provides the data model shared by the reconciliation engine,
//! its command-line front end, and the integration tests:
//! - `cart-sync` - Local/remote cart reconciliation engine
//! - `cart-sync-cli` - Command-line tool driving the engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers over item lists - no
//! I/O, no HTTP clients, no async. This keeps it lightweight and allows it to
//! be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product ids, cart items, shipping info, and item-list helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
