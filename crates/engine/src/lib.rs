//! Cart Sync - shopping cart reconciliation engine.
//!
//! Keeps a locally persisted cart (usable while logged out) consistent with
//! an authoritative remote cart once the user logs in, under unreliable
//! networking, partial failures, and optimistic per-item updates.
//!
//! # Components
//!
//! - [`store`] - durable local snapshot of cart items and shipping info
//! - [`remote`] - remote cart API and catalog lookup
//! - [`reconciler`] - merge/sync algorithms and the observable cart state
//! - [`trigger`] - runs reconciliation when the session logs in
//! - [`session`] - the authenticated-session flag and bearer credential
//! - [`config`] - environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cart_sync::{CartReconciler, CartSyncConfig, FileStorage, HttpCartClient, HttpCatalog,
//!     LocalCartStore, Session, SessionTrigger};
//!
//! let config = CartSyncConfig::from_env()?;
//! let session = Session::new();
//! let reconciler = CartReconciler::new(
//!     LocalCartStore::new(FileStorage::new(&config.storage_dir)),
//!     Arc::new(HttpCartClient::new(config.api_base_url.clone(), session.clone())),
//!     Arc::new(HttpCatalog::new(config.api_base_url.clone(), config.catalog_cache)),
//!     session.clone(),
//! );
//! let _trigger = SessionTrigger::spawn(reconciler.clone());
//!
//! reconciler.add_item(&"64f1c2a9".into(), 2).await?;
//! session.login(token); // guest cart is merged into the account cart
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod reconciler;
pub mod remote;
pub mod session;
pub mod store;
pub mod trigger;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{CartSyncConfig, CatalogCacheConfig, ConfigError};
pub use error::{CartFailure, CartOutcome, PRODUCT_UNAVAILABLE};
pub use reconciler::{CartCommand, CartReconciler, CartState, GuestSyncReport, LoginSync};
pub use remote::{CartApi, Catalog, HttpCartClient, HttpCatalog, RemoteError};
pub use session::Session;
pub use store::{FileStorage, LocalCartStore, MemoryStorage, SnapshotStorage, StoreError};
pub use trigger::SessionTrigger;
