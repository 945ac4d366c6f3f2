//! HTTP implementation of the remote cart API.

use std::sync::Arc;

use async_trait::async_trait;
use cart_sync_core::{CartResponse, ProductId, ShippingInfo, quantity_of};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::wire::{self, AddItemRequest};
use super::{CartApi, RemoteError};
use crate::session::Session;

/// Client for the remote cart endpoints.
///
/// Every request carries the session's bearer credential; calling any
/// operation while logged out fails with `RemoteError::NetworkOrServer`
/// without touching the network.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<HttpCartClientInner>,
}

struct HttpCartClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl std::fmt::Debug for HttpCartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCartClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl HttpCartClient {
    /// Create a new client rooted at `base_url` (which should end with `/`).
    #[must_use]
    pub fn new(base_url: Url, session: Session) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url, session: Session) -> Self {
        Self {
            inner: Arc::new(HttpCartClientInner {
                client,
                base_url,
                session,
            }),
        }
    }

    /// Send an authenticated request and return the response body.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, RemoteError> {
        let token = self.inner.session.token().ok_or_else(|| {
            RemoteError::NetworkOrServer("no session credential".to_string())
        })?;
        let url = endpoint_url(&self.inner.base_url, path)?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            warn!(status = %status, error = %err, "Cart API returned non-success status");
            return Err(err);
        }

        Ok(body)
    }

    async fn send_for_cart<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<CartResponse, RemoteError> {
        let body = self.send(method, path, body).await?;
        wire::parse_cart(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse cart response"
            );
            RemoteError::NetworkOrServer(format!("invalid cart response: {e}"))
        })
    }

    async fn post_add(&self, product: &ProductId, quantity: u32) -> Result<CartResponse, RemoteError> {
        let body = AddItemRequest {
            product_id: product.as_str(),
            quantity,
        };
        self.send_for_cart(Method::POST, "cart/add", Some(&body))
            .await
    }
}

#[async_trait]
impl CartApi for HttpCartClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartResponse, RemoteError> {
        let cart = self
            .send_for_cart::<()>(Method::GET, "cart", None)
            .await?;
        debug!(count = cart.items.len(), "Fetched remote cart");
        Ok(cart)
    }

    // The backend's add endpoint stores the posted quantity as the line
    // total, so adding onto an existing line reads it first and posts the sum.
    #[instrument(skip(self), fields(product_id = %product))]
    async fn add_item(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError> {
        let current = self
            .send_for_cart::<()>(Method::GET, "cart", None)
            .await?;
        let existing = quantity_of(&current.items, product);
        if existing > 0 {
            debug!(existing, quantity, "Adding onto existing remote line");
        }
        self.post_add(product, existing.saturating_add(quantity))
            .await
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn set_quantity(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, RemoteError> {
        self.post_add(product, quantity).await
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn increase(&self, product: &ProductId) -> Result<(), RemoteError> {
        let path = format!("cart/increase/{}", urlencoding::encode(product.as_str()));
        self.send::<()>(Method::PUT, &path, None).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn decrease(&self, product: &ProductId) -> Result<(), RemoteError> {
        let path = format!("cart/decrease/{}", urlencoding::encode(product.as_str()));
        self.send::<()>(Method::PUT, &path, None).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn remove_item(&self, product: &ProductId) -> Result<(), RemoteError> {
        let path = format!("cart/remove/{}", urlencoding::encode(product.as_str()));
        self.send::<()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), RemoteError> {
        self.send::<()>(Method::DELETE, "cart/clear", None).await?;
        Ok(())
    }

    #[instrument(skip(self, info))]
    async fn set_shipping(&self, info: &ShippingInfo) -> Result<(), RemoteError> {
        self.send(Method::POST, "cart/shipping", Some(info)).await?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolve an endpoint path against the API base URL.
pub(super) fn endpoint_url(base: &Url, path: &str) -> Result<Url, RemoteError> {
    base.join(path)
        .map_err(|e| RemoteError::NetworkOrServer(format!("invalid endpoint '{path}': {e}")))
}

/// Map a non-success status to a failure class.
pub(super) fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let message = wire::error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    });

    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::BadRequest(message)
        }
        _ => RemoteError::NetworkOrServer(format!("HTTP {}: {message}", status.as_u16())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = classify_status(StatusCode::NOT_FOUND, r#"{"message": "Product not found"}"#);
        assert_eq!(err, RemoteError::NotFound("Product not found".to_string()));
    }

    #[test]
    fn test_classify_bad_request() {
        let err = classify_status(StatusCode::BAD_REQUEST, "");
        assert_eq!(err, RemoteError::BadRequest("Bad Request".to_string()));

        let err = classify_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"error": "qty"}"#);
        assert_eq!(err, RemoteError::BadRequest("qty".to_string()));
    }

    #[test]
    fn test_classify_everything_else() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            assert!(matches!(
                classify_status(status, ""),
                RemoteError::NetworkOrServer(_)
            ));
        }
    }

    #[test]
    fn test_endpoint_url_appends_to_base_path() {
        let base = Url::parse("https://shop.test/api/v1/").unwrap();
        assert_eq!(
            endpoint_url(&base, "cart/increase/p%201").unwrap().as_str(),
            "https://shop.test/api/v1/cart/increase/p%201"
        );
    }

    #[tokio::test]
    async fn test_logged_out_client_fails_without_network() {
        let client = HttpCartClient::new(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            Session::new(),
        );
        let err = client.fetch_cart().await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::NetworkOrServer("no session credential".to_string())
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let session = Session::with_token(SecretString::from("super-secret-token"));
        let client = HttpCartClient::new(Url::parse("https://shop.test/").unwrap(), session);
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("shop.test"));
        assert!(!debug_output.contains("super-secret-token"));
    }
}
