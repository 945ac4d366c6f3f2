//! Catalog lookup used to build denormalized cart lines.
//!
//! Successful lookups are cached with `moka` so repeated adds of the same
//! product skip the round trip. Failures are never cached: a product that
//! 404s must keep 404ing so stale lines get pruned.

use std::sync::Arc;

use async_trait::async_trait;
use cart_sync_core::{Product, ProductId};
use moka::future::Cache;
use tracing::{debug, instrument, warn};
use url::Url;

use super::RemoteError;
use super::http::{classify_status, endpoint_url};
use super::wire;
use crate::config::CatalogCacheConfig;

/// Resolves product snapshots by id.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the current snapshot of `id`.
    ///
    /// Returns `RemoteError::NotFound` if the product no longer exists.
    async fn product(&self, id: &ProductId) -> Result<Product, RemoteError>;
}

/// Catalog client for `GET /product/{id}`.
#[derive(Clone)]
pub struct HttpCatalog {
    inner: Arc<HttpCatalogInner>,
}

struct HttpCatalogInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<ProductId, Product>,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl HttpCatalog {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(base_url: Url, cache_config: CatalogCacheConfig) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, cache_config)
    }

    /// Create a catalog client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: Url,
        cache_config: CatalogCacheConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_config.capacity)
            .time_to_live(cache_config.ttl)
            .build();

        Self {
            inner: Arc::new(HttpCatalogInner {
                client,
                base_url,
                cache,
            }),
        }
    }

    /// Drop a cached snapshot so the next lookup hits the catalog.
    pub async fn invalidate(&self, id: &ProductId) {
        self.inner.cache.invalidate(id).await;
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &ProductId) -> Result<Product, RemoteError> {
        if let Some(product) = self.inner.cache.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let path = format!("product/{}", urlencoding::encode(id.as_str()));
        let url = endpoint_url(&self.inner.base_url, &path)?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            if !matches!(err, RemoteError::NotFound(_)) {
                warn!(status = %status, error = %err, "Catalog lookup failed");
            }
            return Err(err);
        }

        let product = wire::parse_product(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse catalog product");
            RemoteError::NetworkOrServer(format!("invalid product response: {e}"))
        })?;

        self.inner.cache.insert(id.clone(), product.clone()).await;
        Ok(product)
    }
}
