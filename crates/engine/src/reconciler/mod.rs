//! Cart reconciliation engine.
//!
//! Keeps the locally persisted cart consistent with the authoritative remote
//! cart. Every command updates local state first (optimistic), persists the
//! full snapshot, and then, when the session is authenticated, talks to the
//! remote. The only resilience mechanism is an authoritative re-read after
//! mutations: there are no retries and no timeouts.
//!
//! # Failure policy
//!
//! - Catalog 404 on add: the line is pruned and "Product no longer available"
//!   is returned to the caller
//! - 400 on a direct add: surfaced with the server's message
//! - Anything else: logged, local optimistic state stands, `db_synced` drops
//!   to false until the next successful `refresh`
//!
//! # Ordering
//!
//! Commands that target the same product are serialized through a
//! per-product single-writer queue. Commands on different products, and the
//! whole-cart operations, are not serialized against each other; a slow
//! response may still overwrite a newer one.

mod guard;
mod guest_sync;
mod state;

pub use state::{CartCommand, CartState, GuestSyncReport, LoginSync};

use std::sync::Arc;

use cart_sync_core::{
    CartItem, CartResponse, Product, ProductId, ShippingInfo, find, merge_quantity,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{CartFailure, CartOutcome, PRODUCT_UNAVAILABLE};
use crate::remote::{CartApi, Catalog, RemoteError};
use crate::session::Session;
use crate::store::LocalCartStore;
use guard::{ProductLocks, SyncGuard};

/// The cart reconciler.
///
/// Cheaply cloneable via `Arc`; clones share state, storage, and remotes.
#[derive(Clone)]
pub struct CartReconciler {
    inner: Arc<CartReconcilerInner>,
}

struct CartReconcilerInner {
    store: LocalCartStore,
    remote: Arc<dyn CartApi>,
    catalog: Arc<dyn Catalog>,
    session: Session,
    state: watch::Sender<CartState>,
    product_locks: ProductLocks,
    sync_guard: SyncGuard,
}

impl std::fmt::Debug for CartReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartReconciler")
            .field("state", &*self.inner.state.borrow())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl CartReconciler {
    /// Create a reconciler, hydrating items and shipping info from `store`.
    #[must_use]
    pub fn new(
        store: LocalCartStore,
        remote: Arc<dyn CartApi>,
        catalog: Arc<dyn Catalog>,
        session: Session,
    ) -> Self {
        let initial = CartState {
            items: store.load_items(),
            shipping_info: store.load_shipping(),
            ..CartState::default()
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(CartReconcilerInner {
                store,
                remote,
                catalog,
                session,
                state,
                product_locks: ProductLocks::default(),
                sync_guard: SyncGuard::default(),
            }),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Current items.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.state.borrow().items.clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// The session this reconciler checks before talking to the remote.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Reload items and shipping info from the local store.
    pub fn restore(&self) -> Vec<CartItem> {
        let mut items = Vec::new();
        self.inner.state.send_modify(|state| {
            items = self.inner.store.load_items();
            state.items.clone_from(&items);
            state.shipping_info = self.inner.store.load_shipping();
        });
        items
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run a command through the matching method.
    pub async fn dispatch(&self, command: CartCommand) -> CartOutcome {
        match command {
            CartCommand::Add { product, quantity } => self.add_item(&product, quantity).await,
            CartCommand::Increase(product) => self.increase_qty(&product).await,
            CartCommand::Decrease(product) => self.decrease_qty(&product).await,
            CartCommand::SetQuantity { product, quantity } => {
                self.update_qty(&product, quantity).await
            }
            CartCommand::Remove(product) => self.remove_item(&product).await,
            CartCommand::Clear => self.clear_cart().await,
            CartCommand::Refresh => self.refresh().await,
        }
    }

    /// Add `quantity` units of `product_id`.
    ///
    /// The catalog snapshot is resolved first. The merged line total is then
    /// pushed to the remote and the authoritative cart re-read.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: &ProductId, quantity: u32) -> CartOutcome {
        if quantity == 0 {
            return Err(CartFailure::new("Quantity must be at least 1"));
        }
        let _lock = self.inner.product_locks.acquire(product_id).await;
        self.set_error(None);

        let product = match self.inner.catalog.product(product_id).await {
            Ok(product) => product,
            Err(RemoteError::NotFound(_)) => return Err(self.prune_unavailable(product_id)),
            Err(err) => {
                // A line already in the cart carries its own snapshot.
                let Some(existing) = find(&self.items(), product_id).map(snapshot_of) else {
                    warn!(error = %err, "Catalog lookup failed");
                    return Err(self.fail(format!("Unable to add product: {err}")));
                };
                debug!(error = %err, "Catalog unavailable, reusing cart line snapshot");
                existing
            }
        };

        let mut total = 0;
        let (_, items) = self.modify_items(|items| {
            total = merge_quantity(items, &product, quantity);
            true
        });

        if !self.inner.session.is_authenticated() {
            return Ok(items);
        }

        match self.inner.remote.set_quantity(product_id, total).await {
            Ok(_) => {}
            Err(RemoteError::NotFound(_)) => return Err(self.prune_unavailable(product_id)),
            Err(RemoteError::BadRequest(message)) => {
                self.mark_unsynced();
                return Err(self.fail(message));
            }
            Err(err) => {
                warn!(error = %err, quantity = total, "Remote add failed, keeping local cart");
                self.mark_unsynced();
                return Ok(items);
            }
        }

        match self.fetch_and_apply().await {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(error = %err, "Re-read after add failed, keeping local cart");
                self.mark_unsynced();
                Ok(self.items())
            }
        }
    }

    /// Increment a line by one. Remote failures are logged, never rolled back.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn increase_qty(&self, product_id: &ProductId) -> CartOutcome {
        let _lock = self.inner.product_locks.acquire(product_id).await;
        self.set_error(None);

        let (changed, items) = self.modify_items(|items| {
            match items.iter_mut().find(|item| &item.product == product_id) {
                Some(item) => {
                    item.quantity = item.quantity.saturating_add(1);
                    true
                }
                None => false,
            }
        });
        if !changed {
            return Ok(items);
        }

        if self.inner.session.is_authenticated()
            && let Err(err) = self.inner.remote.increase(product_id).await
        {
            warn!(error = %err, "Remote increase failed, keeping local quantity");
            self.mark_unsynced();
        }
        Ok(items)
    }

    /// Decrement a line by one. No-op (no remote call) at quantity 1.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrease_qty(&self, product_id: &ProductId) -> CartOutcome {
        let _lock = self.inner.product_locks.acquire(product_id).await;
        self.set_error(None);

        let (changed, items) = self.modify_items(|items| {
            match items.iter_mut().find(|item| &item.product == product_id) {
                Some(item) if item.quantity > 1 => {
                    item.quantity -= 1;
                    true
                }
                _ => false,
            }
        });
        if !changed {
            return Ok(items);
        }

        if self.inner.session.is_authenticated()
            && let Err(err) = self.inner.remote.decrease(product_id).await
        {
            warn!(error = %err, "Remote decrease failed, keeping local quantity");
            self.mark_unsynced();
        }
        Ok(items)
    }

    /// Set a line to an absolute quantity (manual input).
    ///
    /// Clamping to `[1, stock]` is the caller's job. On remote failure the
    /// authoritative cart is re-read to undo the optimistic edit.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_qty(&self, product_id: &ProductId, quantity: u32) -> CartOutcome {
        if quantity == 0 {
            return Err(CartFailure::new("Quantity must be at least 1"));
        }
        let _lock = self.inner.product_locks.acquire(product_id).await;
        self.set_error(None);

        let (found, items) = self.modify_items(|items| {
            match items.iter_mut().find(|item| &item.product == product_id) {
                Some(item) => {
                    item.quantity = quantity;
                    true
                }
                None => false,
            }
        });
        if !found {
            return Err(self.fail("Product is not in the cart"));
        }

        if !self.inner.session.is_authenticated() {
            return Ok(items);
        }

        match self.inner.remote.set_quantity(product_id, quantity).await {
            Ok(_) => Ok(items),
            Err(err) => {
                warn!(error = %err, quantity, "Remote update failed, reverting from remote");
                match self.fetch_and_apply().await {
                    Ok(items) => Ok(items),
                    Err(fetch_err) => {
                        warn!(error = %fetch_err, "Revert re-read failed, keeping local cart");
                        self.mark_unsynced();
                        Ok(self.items())
                    }
                }
            }
        }
    }

    /// Remove a line. The remote delete is issued but its outcome ignored.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> CartOutcome {
        let _lock = self.inner.product_locks.acquire(product_id).await;
        self.set_error(None);

        let (_, items) = self.modify_items(|items| {
            let before = items.len();
            items.retain(|item| &item.product != product_id);
            items.len() != before
        });

        if self.inner.session.is_authenticated()
            && let Err(err) = self.inner.remote.remove_item(product_id).await
        {
            debug!(error = %err, "Remote remove failed, ignoring");
        }
        Ok(items)
    }

    /// Empty the cart. Local state always ends empty, whatever the remote does.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> CartOutcome {
        self.inner.state.send_modify(|state| {
            if let Err(err) = self.inner.store.clear_items() {
                warn!(error = %err, "Failed to clear local cart snapshot");
            }
            state.items.clear();
            state.error = None;
        });

        if self.inner.session.is_authenticated()
            && let Err(err) = self.inner.remote.clear().await
        {
            warn!(error = %err, "Remote clear failed, local cart cleared anyway");
            self.mark_unsynced();
        }
        Ok(Vec::new())
    }

    /// Replace local items with the authoritative remote cart.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CartOutcome {
        if !self.inner.session.is_authenticated() {
            return Ok(self.items());
        }

        self.set_loading(true);
        let result = self.fetch_and_apply().await;
        self.set_loading(false);

        result.map_err(|err| {
            warn!(error = %err, "Failed to fetch remote cart");
            self.mark_unsynced();
            self.fail("Unable to load your cart")
        })
    }

    /// Persist shipping info locally, then push it to the remote.
    #[instrument(skip(self, info))]
    pub async fn set_shipping(&self, info: ShippingInfo) {
        self.inner.state.send_modify(|state| {
            if let Err(err) = self.inner.store.save_shipping(&info) {
                warn!(error = %err, "Failed to persist shipping info");
            }
            state.shipping_info = info.clone();
        });

        if self.inner.session.is_authenticated()
            && let Err(err) = self.inner.remote.set_shipping(&info).await
        {
            warn!(error = %err, "Remote shipping update failed");
        }
    }

    /// Session ended: drop the local copy of the account cart.
    ///
    /// The remote cart is untouched; the next login re-reads it.
    pub fn on_logout(&self) {
        self.inner.state.send_modify(|state| {
            if let Err(err) = self.inner.store.clear_items() {
                warn!(error = %err, "Failed to clear local cart snapshot on logout");
            }
            state.items.clear();
            state.db_synced = false;
            state.loading = false;
            state.error = None;
        });
        info!("Local cart cleared on logout");
    }

    /// Reconcile after the session became authenticated. Runs at most once
    /// per login.
    ///
    /// A non-empty guest cart is pushed with [`CartReconciler::guest_cart_sync`];
    /// an empty one just reads the remote cart.
    #[instrument(skip(self))]
    pub async fn sync_on_login(&self) -> LoginSync {
        if !self.inner.session.is_authenticated() {
            return LoginSync::Skipped;
        }
        let Some(_token) = self.inner.sync_guard.try_acquire() else {
            debug!("Login sync already in flight");
            return LoginSync::Skipped;
        };

        let current = self.state();
        if current.db_synced || current.loading {
            return LoginSync::Skipped;
        }

        self.set_loading(true);
        let outcome = if current.items.is_empty() {
            match self.fetch_and_apply().await {
                Ok(_) => LoginSync::Fetched,
                Err(err) => {
                    warn!(error = %err, "Failed to fetch remote cart after login");
                    LoginSync::Unavailable
                }
            }
        } else {
            LoginSync::Merged(self.guest_cart_sync(current.items).await)
        };
        self.set_loading(false);

        info!(outcome = ?outcome, "Login sync finished");
        outcome
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Read the remote cart and make it the local state.
    async fn fetch_and_apply(&self) -> Result<Vec<CartItem>, RemoteError> {
        let cart = self.inner.remote.fetch_cart().await?;
        Ok(self.apply_remote(cart))
    }

    fn apply_remote(&self, cart: CartResponse) -> Vec<CartItem> {
        let CartResponse {
            items,
            shipping_info,
        } = cart;

        self.inner.state.send_modify(|state| {
            self.persist(&items);
            if let Some(info) = &shipping_info
                && let Err(err) = self.inner.store.save_shipping(info)
            {
                warn!(error = %err, "Failed to persist shipping info");
            }
            state.items.clone_from(&items);
            if let Some(info) = shipping_info {
                state.shipping_info = info;
            }
            state.db_synced = true;
        });
        items
    }

    /// Apply `f` to the items. If it reports a change, persist and publish
    /// the full snapshot. Returns whether anything changed and the items.
    ///
    /// Snapshots are written while the state lock is held, so the store
    /// always ends with the same items as the last published state.
    fn modify_items(&self, f: impl FnOnce(&mut Vec<CartItem>) -> bool) -> (bool, Vec<CartItem>) {
        let mut changed = false;
        let mut snapshot = Vec::new();
        self.inner.state.send_if_modified(|state| {
            changed = f(&mut state.items);
            if changed {
                self.persist(&state.items);
            }
            snapshot.clone_from(&state.items);
            changed
        });
        (changed, snapshot)
    }

    /// Replace the items wholesale and persist them.
    fn replace_items(&self, items: Vec<CartItem>) {
        self.inner.state.send_modify(|state| {
            self.persist(&items);
            state.items = items;
        });
    }

    fn persist(&self, items: &[CartItem]) {
        if let Err(err) = self.inner.store.save_items(items) {
            warn!(error = %err, "Failed to persist cart snapshot");
        }
    }

    /// Drop a product that vanished from the catalog and report it.
    fn prune_unavailable(&self, product_id: &ProductId) -> CartFailure {
        info!(product_id = %product_id, "Pruning unavailable product");
        self.modify_items(|items| {
            let before = items.len();
            items.retain(|item| &item.product != product_id);
            items.len() != before
        });
        self.set_error(Some(PRODUCT_UNAVAILABLE.to_string()));
        CartFailure::product_unavailable()
    }

    /// Record a user-visible error and build the matching failure.
    fn fail(&self, message: impl Into<String>) -> CartFailure {
        let failure = CartFailure::new(message);
        self.set_error(Some(failure.message.clone()));
        failure
    }

    fn set_error(&self, error: Option<String>) {
        self.inner.state.send_if_modified(|state| {
            if state.error == error {
                return false;
            }
            state.error = error;
            true
        });
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    fn mark_unsynced(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.db_synced;
            state.db_synced = false;
            changed
        });
    }
}

/// Rebuild a catalog snapshot from an existing cart line.
fn snapshot_of(item: &CartItem) -> Product {
    Product {
        id: item.product.clone(),
        name: item.name.clone(),
        price: item.price,
        image: item.image.clone(),
        stock: item.stock,
    }
}
