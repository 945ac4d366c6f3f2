//! In-memory fakes of the remote cart API and catalog.
//!
//! Compiled for this crate's tests and, behind the `test-util` feature, for
//! other crates' tests. The fake cart behaves like the real backend (lines
//! keyed by product, 404 for unknown products) and records every call in
//! order so tests can assert on sequencing and concurrency.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cart_sync_core::{CartItem, CartResponse, Product, ProductId, ShippingInfo};
use rust_decimal::Decimal;

use crate::remote::{CartApi, Catalog, RemoteError};

/// Build a catalog product with a price in cents.
#[must_use]
pub fn product(id: &str, price_cents: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::new(price_cents, 2),
        image: format!("https://cdn.test/{id}.jpg"),
        stock,
    }
}

/// A fake cart API and catalog sharing the same product list.
#[must_use]
pub fn fake_backend(products: &[Product]) -> (Arc<FakeCartApi>, Arc<FakeCatalog>) {
    (
        Arc::new(FakeCartApi::new(products)),
        Arc::new(FakeCatalog::new(products)),
    )
}

fn offline() -> RemoteError {
    RemoteError::NetworkOrServer("connection refused".to_string())
}

// =============================================================================
// Cart API
// =============================================================================

/// A recorded call to [`FakeCartApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchCart,
    AddItem(ProductId, u32),
    SetQuantity(ProductId, u32),
    Increase(ProductId),
    Decrease(ProductId),
    RemoveItem(ProductId),
    Clear,
    SetShipping(ShippingInfo),
}

#[derive(Debug, Default)]
struct FakeCartState {
    products: HashMap<ProductId, Product>,
    items: Vec<CartItem>,
    shipping_info: Option<ShippingInfo>,
    calls: Vec<RemoteCall>,
    offline: bool,
    item_failures: HashMap<ProductId, RemoteError>,
    fetch_failures: usize,
    latency: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory remote cart.
#[derive(Debug, Default)]
pub struct FakeCartApi {
    state: Mutex<FakeCartState>,
}

impl FakeCartApi {
    /// Create an empty remote cart that knows `products`.
    #[must_use]
    pub fn new(products: &[Product]) -> Self {
        let state = FakeCartState {
            products: products.iter().map(|p| (p.id.clone(), p.clone())).collect(),
            ..FakeCartState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeCartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail with `NetworkOrServer`.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make every write for `product` fail with `err`.
    pub fn fail_item(&self, product: &ProductId, err: RemoteError) {
        self.lock().item_failures.insert(product.clone(), err);
    }

    /// Make the next `count` fetches fail with `NetworkOrServer`.
    pub fn fail_next_fetches(&self, count: usize) {
        self.lock().fetch_failures = count;
    }

    /// Delay every call by `latency` so overlapping calls become observable.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Seed the remote cart.
    pub fn set_items(&self, items: Vec<CartItem>) {
        self.lock().items = items;
    }

    /// Current remote cart lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().items.clone()
    }

    /// Shipping info last pushed.
    #[must_use]
    pub fn shipping_info(&self) -> Option<ShippingInfo> {
        self.lock().shipping_info.clone()
    }

    /// Every call received, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Highest number of calls that were in progress at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Record the call and apply `op` after the configured latency.
    async fn call<T>(
        &self,
        call: RemoteCall,
        op: impl FnOnce(&mut FakeCartState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let latency = {
            let mut state = self.lock();
            state.calls.push(call);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };

        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        let mut state = self.lock();
        state.in_flight -= 1;
        if state.offline {
            return Err(offline());
        }
        op(&mut *state)
    }
}

impl FakeCartState {
    fn check_item(&self, product: &ProductId) -> Result<&Product, RemoteError> {
        if let Some(err) = self.item_failures.get(product) {
            return Err(err.clone());
        }
        self.products
            .get(product)
            .ok_or_else(|| RemoteError::NotFound(format!("Product not found: {product}")))
    }

    fn line_mut(&mut self, product: &ProductId) -> Result<&mut CartItem, RemoteError> {
        self.items
            .iter_mut()
            .find(|item| &item.product == product)
            .ok_or_else(|| RemoteError::NotFound(format!("Item not in cart: {product}")))
    }

    fn upsert(&mut self, product: &ProductId, quantity: u32, additive: bool) -> Result<(), RemoteError> {
        if quantity == 0 {
            return Err(RemoteError::BadRequest("Quantity must be positive".to_string()));
        }
        let snapshot = self.check_item(product)?.clone();
        match self.items.iter_mut().find(|item| &item.product == product) {
            Some(line) if additive => line.quantity += quantity,
            Some(line) => line.quantity = quantity,
            None => self.items.push(snapshot.to_cart_item(quantity)),
        }
        Ok(())
    }

    fn response(&self) -> CartResponse {
        CartResponse {
            items: self.items.clone(),
            shipping_info: self.shipping_info.clone(),
        }
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn fetch_cart(&self) -> Result<CartResponse, RemoteError> {
        self.call(RemoteCall::FetchCart, |state| {
            if state.fetch_failures > 0 {
                state.fetch_failures -= 1;
                return Err(offline());
            }
            Ok(state.response())
        })
        .await
    }

    async fn add_item(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError> {
        self.call(RemoteCall::AddItem(product.clone(), quantity), |state| {
            state.upsert(product, quantity, true)?;
            Ok(state.response())
        })
        .await
    }

    async fn set_quantity(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError> {
        self.call(RemoteCall::SetQuantity(product.clone(), quantity), |state| {
            state.upsert(product, quantity, false)?;
            Ok(state.response())
        })
        .await
    }

    async fn increase(&self, product: &ProductId) -> Result<(), RemoteError> {
        self.call(RemoteCall::Increase(product.clone()), |state| {
            state.check_item(product)?;
            state.line_mut(product)?.quantity += 1;
            Ok(())
        })
        .await
    }

    async fn decrease(&self, product: &ProductId) -> Result<(), RemoteError> {
        self.call(RemoteCall::Decrease(product.clone()), |state| {
            state.check_item(product)?;
            let line = state.line_mut(product)?;
            line.quantity = line.quantity.saturating_sub(1).max(1);
            Ok(())
        })
        .await
    }

    async fn remove_item(&self, product: &ProductId) -> Result<(), RemoteError> {
        self.call(RemoteCall::RemoveItem(product.clone()), |state| {
            state.items.retain(|item| &item.product != product);
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        self.call(RemoteCall::Clear, |state| {
            state.items.clear();
            Ok(())
        })
        .await
    }

    async fn set_shipping(&self, info: &ShippingInfo) -> Result<(), RemoteError> {
        self.call(RemoteCall::SetShipping(info.clone()), |state| {
            state.shipping_info = Some(info.clone());
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Default)]
struct FakeCatalogState {
    products: HashMap<ProductId, Product>,
    offline: HashSet<ProductId>,
    lookups: usize,
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    state: Mutex<FakeCatalogState>,
}

impl FakeCatalog {
    /// Create a catalog holding `products`.
    #[must_use]
    pub fn new(products: &[Product]) -> Self {
        let state = FakeCatalogState {
            products: products.iter().map(|p| (p.id.clone(), p.clone())).collect(),
            ..FakeCatalogState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeCatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delete a product so lookups 404.
    pub fn remove_product(&self, id: &ProductId) {
        self.lock().products.remove(id);
    }

    /// Make lookups of `id` fail with `NetworkOrServer`.
    pub fn set_unreachable(&self, id: &ProductId) {
        self.lock().offline.insert(id.clone());
    }

    /// Number of lookups served.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.lookups += 1;
        if state.offline.contains(id) {
            return Err(offline());
        }
        state
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("Product not found: {id}")))
    }
}
