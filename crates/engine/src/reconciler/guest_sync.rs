//! Pushing a guest cart into the account cart after login.
//!
//! The remote add endpoint does an unlocked read-modify-write on the cart
//! document, so concurrent adds race and a later write can silently drop an
//! earlier merge. Items are therefore sent strictly one at a time: item
//! `i + 1` is not sent until the response for item `i` has arrived.

use cart_sync_core::CartItem;
use tracing::{info, instrument, warn};

use super::{CartReconciler, GuestSyncReport};

impl CartReconciler {
    /// Merge `local_items` into the remote cart, then adopt the remote cart.
    ///
    /// Never fails outward. Items the remote rejects (404/400) are dropped;
    /// other per-item failures are logged and the loop moves on. Afterwards
    /// the surviving items are persisted and the authoritative cart is read
    /// back; if that read fails it is attempted once more before the local
    /// cart is left as is with `db_synced == false`.
    #[instrument(skip(self, local_items), fields(count = local_items.len()))]
    pub async fn guest_cart_sync(&self, local_items: Vec<CartItem>) -> GuestSyncReport {
        let mut report = GuestSyncReport::default();
        let mut surviving = local_items.clone();

        for item in &local_items {
            match self
                .inner
                .remote
                .add_item(&item.product, item.quantity)
                .await
            {
                Ok(_) => report.accepted.push(item.product.clone()),
                Err(err) if err.is_item_rejected() => {
                    warn!(product_id = %item.product, error = %err, "Remote rejected guest item, dropping");
                    surviving.retain(|kept| kept.product != item.product);
                    report.rejected.push(item.product.clone());
                }
                Err(err) => {
                    warn!(product_id = %item.product, error = %err, "Failed to sync guest item");
                    report.failed.push(item.product.clone());
                }
            }
        }

        self.replace_items(surviving);

        let fetched = match self.fetch_and_apply().await {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(error = %err, "Re-read after guest sync failed, falling back to a fresh fetch");
                self.fetch_and_apply().await
            }
        };

        match fetched {
            Ok(items) => {
                report.synced = true;
                info!(
                    accepted = report.accepted.len(),
                    rejected = report.rejected.len(),
                    failed = report.failed.len(),
                    items = items.len(),
                    "Guest cart synced"
                );
            }
            Err(err) => {
                warn!(error = %err, "Remote cart unavailable, keeping local cart");
                self.mark_unsynced();
            }
        }

        report
    }
}
