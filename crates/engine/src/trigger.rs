//! Login/logout edge detection.
//!
//! Reconciliation runs when the session flips from guest to authenticated;
//! the reconciler's single-flight guard and `db_synced` flag make sure it
//! runs at most once per login even if edges are reported twice.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::reconciler::{CartReconciler, LoginSync};

/// Turns authenticated-flag changes into reconciler calls.
#[derive(Debug)]
pub struct SessionTrigger {
    reconciler: CartReconciler,
    authenticated: bool,
}

impl SessionTrigger {
    /// Create a trigger that starts out assuming a guest session.
    #[must_use]
    pub const fn new(reconciler: CartReconciler) -> Self {
        Self::resume(reconciler, false)
    }

    /// Create a trigger that picks up from a known flag, such as the one a
    /// previous process recorded next to the local snapshot.
    #[must_use]
    pub const fn resume(reconciler: CartReconciler, authenticated: bool) -> Self {
        Self {
            reconciler,
            authenticated,
        }
    }

    /// Report the current authenticated flag.
    ///
    /// On a guest -> authenticated edge the login sync runs and its result is
    /// returned. On authenticated -> guest the local account cart is dropped.
    /// Repeated reports of the same value do nothing.
    pub async fn observe(&mut self, authenticated: bool) -> Option<LoginSync> {
        let was = std::mem::replace(&mut self.authenticated, authenticated);
        match (was, authenticated) {
            (false, true) => Some(self.reconciler.sync_on_login().await),
            (true, false) => {
                self.reconciler.on_logout();
                None
            }
            _ => None,
        }
    }

    /// Follow the reconciler's session on a background task.
    ///
    /// A session that is already authenticated when the task starts counts as
    /// a login. The task runs until aborted through the returned handle.
    #[must_use]
    pub fn spawn(reconciler: CartReconciler) -> JoinHandle<()> {
        let mut rx = reconciler.session().subscribe();
        let mut trigger = Self::new(reconciler);

        tokio::spawn(async move {
            let authenticated = rx.borrow_and_update().is_some();
            trigger.observe(authenticated).await;

            while rx.changed().await.is_ok() {
                let authenticated = rx.borrow_and_update().is_some();
                if let Some(outcome) = trigger.observe(authenticated).await {
                    debug!(outcome = ?outcome, "Session login handled");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::time::Duration;

    use cart_sync_core::ProductId;
    use secrecy::SecretString;

    use super::*;
    use crate::session::Session;
    use crate::store::LocalCartStore;
    use crate::testing::{FakeCartApi, fake_backend, product};

    fn setup(session: &Session) -> (CartReconciler, Arc<FakeCartApi>) {
        let (api, catalog) = fake_backend(&[product("P1", 1000, 5)]);
        let reconciler = CartReconciler::new(
            LocalCartStore::in_memory(),
            api.clone(),
            catalog,
            session.clone(),
        );
        (reconciler, api)
    }

    #[tokio::test]
    async fn observe_reacts_to_edges_only() {
        let session = Session::new();
        let (reconciler, api) = setup(&session);
        let mut trigger = SessionTrigger::new(reconciler.clone());

        assert_eq!(trigger.observe(false).await, None);

        session.login(SecretString::from("token"));
        assert_eq!(trigger.observe(true).await, Some(LoginSync::Fetched));
        assert_eq!(trigger.observe(true).await, None);
        assert_eq!(api.calls().len(), 1);

        session.logout();
        assert_eq!(trigger.observe(false).await, None);
        assert!(!reconciler.state().db_synced);
    }

    #[tokio::test]
    async fn resumed_trigger_sees_logout_edge() {
        let session = Session::new();
        let (reconciler, api) = setup(&session);
        reconciler.add_item(&ProductId::new("P1"), 2).await.unwrap();

        let mut still_in = SessionTrigger::resume(reconciler.clone(), true);
        assert_eq!(still_in.observe(true).await, None);
        assert_eq!(reconciler.items().len(), 1);

        let mut logged_out = SessionTrigger::resume(reconciler.clone(), true);
        assert_eq!(logged_out.observe(false).await, None);
        assert!(reconciler.items().is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn spawned_trigger_merges_on_login() {
        let session = Session::new();
        let (reconciler, api) = setup(&session);
        reconciler.add_item(&ProductId::new("P1"), 2).await.unwrap();

        let handle = SessionTrigger::spawn(reconciler.clone());
        let mut state = reconciler.subscribe();
        session.login(SecretString::from("token"));

        tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| s.db_synced))
            .await
            .unwrap()
            .unwrap();
        handle.abort();

        assert_eq!(api.items().len(), 1);
        assert_eq!(api.items()[0].quantity, 2);
    }
}
