//! Cart subcommands.
//!
//! Each invocation builds a [`CartReconciler`] over the on-disk snapshot,
//! brings it up to date with the remote (when a token is configured), runs
//! one command, and prints the resulting cart.
//!
//! Whether the previous invocation ran with a token is recorded next to the
//! snapshot. A change since then is replayed as a login or logout edge, so a
//! guest cart is merged by whichever command first runs with a token, and an
//! account cart mirror is never merged a second time.

use std::sync::Arc;

use cart_sync::{
    CartFailure, CartReconciler, CartSyncConfig, ConfigError, FileStorage, HttpCartClient,
    HttpCatalog, LocalCartStore, LoginSync, Session, SessionTrigger, SnapshotStorage,
};
use cart_sync_core::{ProductId, ShippingInfo, find};
use clap::Args;
use thiserror::Error;
use tracing::{info, warn};

mod render;

/// Snapshot key holding the session mode of the last invocation.
const SESSION_MODE_KEY: &str = "sessionMode";
const MODE_ACCOUNT: &str = "account";
const MODE_GUEST: &str = "guest";

/// Errors that end a CLI invocation with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cart command failed; the message is user-facing.
    #[error("{0}")]
    Cart(#[from] CartFailure),

    /// Shipping fields were blank.
    #[error("Shipping info is incomplete: address, city, postal code and country are required")]
    IncompleteShipping,
}

/// Arguments of the `shipping` subcommand.
#[derive(Debug, Args)]
pub struct ShippingArgs {
    /// Street address
    #[arg(long)]
    pub address: String,

    /// City
    #[arg(long)]
    pub city: String,

    /// State or region
    #[arg(long)]
    pub state: Option<String>,

    /// Postal code
    #[arg(long)]
    pub postal_code: String,

    /// Country
    #[arg(long)]
    pub country: String,

    /// Contact phone number
    #[arg(long)]
    pub phone: Option<String>,
}

impl From<ShippingArgs> for ShippingInfo {
    fn from(args: ShippingArgs) -> Self {
        Self {
            address: args.address,
            city: args.city,
            state: args.state.unwrap_or_default(),
            postal_code: args.postal_code,
            country: args.country,
            phone_no: args.phone.unwrap_or_default(),
        }
    }
}

/// Wiring for one CLI invocation.
pub struct CartContext {
    reconciler: CartReconciler,
    storage: FileStorage,
}

impl CartContext {
    /// Load configuration from the environment and build the reconciler.
    pub fn from_env() -> Result<Self, CliError> {
        let config = CartSyncConfig::from_env()?;
        Ok(Self::from_config(&config))
    }

    /// Build the reconciler; local items and shipping info are hydrated from
    /// the snapshot directory.
    pub fn from_config(config: &CartSyncConfig) -> Self {
        let session = config
            .session_token
            .clone()
            .map_or_else(Session::new, Session::with_token);
        let storage = FileStorage::new(config.storage_dir.clone());
        let store = LocalCartStore::new(storage.clone());
        let remote = HttpCartClient::new(config.api_base_url.clone(), session.clone());
        let catalog = HttpCatalog::new(config.api_base_url.clone(), config.catalog_cache);

        Self::with_parts(
            CartReconciler::new(store, Arc::new(remote), Arc::new(catalog), session),
            storage,
        )
    }

    /// Use an existing reconciler. `storage` must be the directory its store
    /// writes to.
    pub const fn with_parts(reconciler: CartReconciler, storage: FileStorage) -> Self {
        Self {
            reconciler,
            storage,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.reconciler.session().is_authenticated()
    }

    fn was_authenticated(&self) -> bool {
        self.storage
            .read(SESSION_MODE_KEY)
            .is_some_and(|mode| mode.trim() == MODE_ACCOUNT)
    }

    fn remember_mode(&self, authenticated: bool) {
        let mode = if authenticated { MODE_ACCOUNT } else { MODE_GUEST };
        if let Err(err) = self.storage.write(SESSION_MODE_KEY, mode) {
            warn!(error = %err, "Failed to record session mode");
        }
    }

    /// Bring the local cart in line with the session before a command runs.
    ///
    /// A token that was absent last time is a login: the guest cart is merged
    /// (or the account cart fetched when there is none). A token that went
    /// away is a logout. Otherwise a logged-in run re-reads the account cart,
    /// and an unreachable remote leaves the local snapshot in place.
    pub async fn prepare(&self) -> Option<LoginSync> {
        let was = self.was_authenticated();
        let now = self.is_authenticated();

        let outcome = if was && now {
            if let Err(err) = self.reconciler.refresh().await {
                warn!(error = %err, "Remote cart unavailable, using local snapshot");
            }
            None
        } else {
            SessionTrigger::resume(self.reconciler.clone(), was)
                .observe(now)
                .await
        };

        // An empty login that could not reach the remote is retried next run.
        let login_pending = matches!(outcome, Some(LoginSync::Unavailable));
        self.remember_mode(now && !login_pending);
        outcome
    }

    /// Report what [`CartContext::prepare`] did for the `sync` command.
    pub fn sync(&self, outcome: Option<&LoginSync>) {
        if !self.is_authenticated() {
            info!("CART_SESSION_TOKEN not set, nothing to sync");
            return;
        }
        let skipped = LoginSync::Skipped;
        let outcome = outcome.unwrap_or(&skipped);
        render::sync_outcome(outcome);
        if let LoginSync::Merged(report) = outcome {
            info!(
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                failed = report.failed.len(),
                "Guest cart merged"
            );
        }
    }

    pub async fn add(&self, product: String, quantity: u32) -> Result<(), CliError> {
        self.reconciler
            .add_item(&ProductId::from(product), quantity)
            .await?;
        Ok(())
    }

    pub async fn increase(&self, product: String) -> Result<(), CliError> {
        self.reconciler
            .increase_qty(&ProductId::from(product))
            .await?;
        Ok(())
    }

    pub async fn decrease(&self, product: String) -> Result<(), CliError> {
        self.reconciler
            .decrease_qty(&ProductId::from(product))
            .await?;
        Ok(())
    }

    /// Set an exact quantity, clamped to the line's known stock.
    pub async fn set(&self, product: String, quantity: u32) -> Result<(), CliError> {
        let id = ProductId::from(product);
        let stock = find(&self.reconciler.items(), &id).map_or(0, |item| item.stock);
        let clamped = clamp_quantity(quantity, stock);
        if clamped != quantity {
            info!(product_id = %id, requested = quantity, stock, "Quantity clamped to stock");
        }
        self.reconciler.update_qty(&id, clamped).await?;
        Ok(())
    }

    pub async fn remove(&self, product: String) -> Result<(), CliError> {
        self.reconciler
            .remove_item(&ProductId::from(product))
            .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CliError> {
        self.reconciler.clear_cart().await?;
        Ok(())
    }

    pub async fn shipping(&self, args: ShippingArgs) -> Result<(), CliError> {
        let info = ShippingInfo::from(args);
        if !info.is_complete() {
            return Err(CliError::IncompleteShipping);
        }
        self.reconciler.set_shipping(info).await;
        Ok(())
    }

    /// Print the cart table.
    pub fn show(&self) {
        render::cart(&self.reconciler.state(), self.is_authenticated());
    }
}

/// Clamp a requested quantity to `[1, stock]`. Unknown stock (0) only
/// enforces the lower bound.
fn clamp_quantity(requested: u32, stock: u32) -> u32 {
    let requested = requested.max(1);
    if stock == 0 {
        requested
    } else {
        requested.min(stock)
    }
}
