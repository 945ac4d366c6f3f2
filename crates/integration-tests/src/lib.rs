//! Integration tests for cart-sync.
//!
//! Tests drive a real [`CartReconciler`] over HTTP against
//! [`MockCartServer`], with snapshots written to a temporary directory so a
//! "restart" is just building a second reconciler over the same directory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cart-sync-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod mock_server;

use std::sync::Arc;

use cart_sync::{
    CartReconciler, CartSyncConfig, FileStorage, HttpCartClient, HttpCatalog, LocalCartStore,
    Session,
};
use cart_sync_core::Product;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

pub use cart_sync::testing::product;
pub use mock_server::{MockCartServer, RecordedRequest};

/// Bearer token the mock backend accepts.
pub const TOKEN: &str = "k7Qm2vX9pLr4TzW8bN3cHs6fYd1gJe5a";

/// A running mock backend plus a snapshot directory.
pub struct TestContext {
    pub server: MockCartServer,
    pub config: CartSyncConfig,
    pub session: Session,
    storage_dir: TempDir,
}

impl TestContext {
    /// Start a backend that knows `products`, with a guest session.
    ///
    /// # Panics
    ///
    /// Panics if the server or the temp directory cannot be created.
    pub async fn start(products: &[Product]) -> Self {
        let (server, base_url) = MockCartServer::start(products, TOKEN).await;
        let storage_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = config_for(&base_url, &storage_dir);

        Self {
            server,
            config,
            session: Session::new(),
            storage_dir,
        }
    }

    /// Log the shared session in with the accepted token.
    pub fn login(&self) {
        self.session.login(SecretString::from(TOKEN));
    }

    /// Build a reconciler over the snapshot directory, as an app start would.
    #[must_use]
    pub fn reconciler(&self) -> CartReconciler {
        CartReconciler::new(
            self.store(),
            Arc::new(HttpCartClient::new(
                self.config.api_base_url.clone(),
                self.session.clone(),
            )),
            Arc::new(HttpCatalog::new(
                self.config.api_base_url.clone(),
                self.config.catalog_cache,
            )),
            self.session.clone(),
        )
    }

    /// A store reading the same snapshot directory.
    #[must_use]
    pub fn store(&self) -> LocalCartStore {
        LocalCartStore::new(FileStorage::new(self.storage_dir.path()))
    }
}

/// Load configuration the way the CLI does, from environment-style keys.
fn config_for(base_url: &Url, storage_dir: &TempDir) -> CartSyncConfig {
    let base = base_url.to_string();
    let dir = storage_dir.path().display().to_string();
    CartSyncConfig::from_lookup(|key| match key {
        "CART_API_BASE_URL" => Some(base.clone()),
        "CART_STORAGE_DIR" => Some(dir.clone()),
        "CART_CATALOG_CACHE_TTL_SECS" => Some("60".to_string()),
        _ => None,
    })
    .expect("Mock configuration is valid")
}
