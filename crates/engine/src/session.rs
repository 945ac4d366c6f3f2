//! Authenticated-session flag shared by the HTTP clients and the login trigger.
//!
//! The session holds the bearer credential in a `watch` channel: the HTTP
//! client reads the current token on every request, and
//! [`SessionTrigger`](crate::trigger::SessionTrigger) observes the
//! authenticated flag flipping.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::watch;

/// Shared authentication state.
///
/// Cheaply cloneable; clones observe and mutate the same session.
#[derive(Clone)]
pub struct Session {
    token: Arc<watch::Sender<Option<SecretString>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an unauthenticated (guest) session.
    #[must_use]
    pub fn new() -> Self {
        let (token, _) = watch::channel(None);
        Self {
            token: Arc::new(token),
        }
    }

    /// Create a session that is already authenticated with `token`.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        let (token, _) = watch::channel(Some(token));
        Self {
            token: Arc::new(token),
        }
    }

    /// Store a credential, flipping the session to authenticated.
    pub fn login(&self, token: SecretString) {
        self.token.send_replace(Some(token));
    }

    /// Drop the credential, flipping the session back to guest.
    pub fn logout(&self) {
        self.token.send_if_modified(|current| current.take().is_some());
    }

    /// Whether a credential is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    /// Current credential, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.token.borrow().clone()
    }

    /// Receiver notified whenever the credential changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SecretString>> {
        self.token.subscribe()
    }
}
