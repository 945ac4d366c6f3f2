//! Serialization primitives for reconciler commands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cart_sync_core::ProductId;
use tokio::sync::OwnedMutexGuard;

/// Per-product single-writer queue.
///
/// Commands on the same product acquire the same async mutex, so they run
/// one at a time in the order they were issued (tokio mutexes are fair).
/// Commands on different products never wait on each other.
#[derive(Debug, Default)]
pub(crate) struct ProductLocks {
    locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProductLocks {
    /// Wait for exclusive access to `product`.
    pub(crate) async fn acquire(&self, product: &ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(product.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Single-flight token for the login-triggered sync.
#[derive(Debug, Default)]
pub(crate) struct SyncGuard {
    in_flight: AtomicBool,
}

impl SyncGuard {
    /// Claim the token, or `None` if a sync is already running.
    pub(crate) fn try_acquire(&self) -> Option<SyncToken<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncToken { guard: self })
    }
}

/// Held while a login sync runs; releases the guard on drop.
#[derive(Debug)]
pub(crate) struct SyncToken<'a> {
    guard: &'a SyncGuard,
}

impl Drop for SyncToken<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}
