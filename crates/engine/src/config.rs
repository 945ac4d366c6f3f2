//! Cart sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_BASE_URL` - Base URL of the remote cart API (e.g., `https://shop.example.com/api/v1`)
//!
//! ## Optional
//! - `CART_SESSION_TOKEN` - Bearer credential for the remote cart; its presence means "logged in"
//! - `CART_STORAGE_DIR` - Directory for the local cart snapshots (default: .cart)
//! - `CART_CATALOG_CACHE_TTL_SECS` - Catalog lookup cache TTL (default: 300)
//! - `CART_CATALOG_CACHE_CAPACITY` - Catalog lookup cache size (default: 1000)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of placeholder words (case-insensitive, whole words only).
///
/// Session tokens are opaque base64/JWT text, so substrings like `xxx` or
/// `todo` occur in real credentials; only a standalone word counts.
const PLACEHOLDER_WORDS: &[&str] = &[
    "your",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "todo",
    "fixme",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart sync configuration.
///
/// Implements `Debug` manually to redact the session token.
#[derive(Clone)]
pub struct CartSyncConfig {
    /// Base URL of the remote cart API. Endpoint paths are joined onto it.
    pub api_base_url: Url,
    /// Bearer credential for an authenticated session, if any.
    pub session_token: Option<SecretString>,
    /// Directory holding the local cart and shipping snapshots.
    pub storage_dir: PathBuf,
    /// Catalog lookup cache settings.
    pub catalog_cache: CatalogCacheConfig,
}

impl std::fmt::Debug for CartSyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSyncConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("storage_dir", &self.storage_dir)
            .field("catalog_cache", &self.catalog_cache)
            .finish()
    }
}

/// Catalog lookup cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCacheConfig {
    /// How long a resolved product stays cached.
    pub ttl: Duration,
    /// Maximum number of cached products.
    pub capacity: u64,
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 1000,
        }
    }
}

impl CartSyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the session token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CartSyncConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("CART_API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CART_API_BASE_URL".to_string()))?;
        let api_base_url = parse_base_url(&raw_url)?;

        let session_token = match lookup("CART_SESSION_TOKEN").filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                validate_secret_strength(&token, "CART_SESSION_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let storage_dir = PathBuf::from(
            lookup("CART_STORAGE_DIR").unwrap_or_else(|| ".cart".to_string()),
        );

        let defaults = CatalogCacheConfig::default();
        let ttl = parse_or_default(
            lookup("CART_CATALOG_CACHE_TTL_SECS"),
            "CART_CATALOG_CACHE_TTL_SECS",
            defaults.ttl.as_secs(),
        )?;
        let capacity = parse_or_default(
            lookup("CART_CATALOG_CACHE_CAPACITY"),
            "CART_CATALOG_CACHE_CAPACITY",
            defaults.capacity,
        )?;

        Ok(Self {
            api_base_url,
            session_token,
            storage_dir,
            catalog_cache: CatalogCacheConfig {
                ttl: Duration::from_secs(ttl),
                capacity,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL, forcing a trailing slash so `Url::join` appends
/// endpoint paths instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("CART_API_BASE_URL".to_string(), msg);

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_or_default(value: Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    value.map_or(Ok(default), |v| {
        v.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// First placeholder word in `secret`, splitting on anything but ASCII
/// letters and digits. A run of three or more `x` also counts.
fn placeholder_word(secret: &str) -> Option<String> {
    secret
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| {
            PLACEHOLDER_WORDS.contains(word) || (word.len() >= 3 && word.chars().all(|c| c == 'x'))
        })
        .map(String::from)
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if let Some(word) = placeholder_word(secret) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{word}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
