//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; sensible defaults cover a standard
//! deployment's set layout.
//!
//! - `CLOUDBERRY_PRODUCTS_SET` - products set name (default: products)
//! - `CLOUDBERRY_CARTS_SET` - carts set name (default: `shopping_carts`)
//! - `CLOUDBERRY_META_SET` - rollup set name (default: `cat_index`)
//! - `CLOUDBERRY_META_KEY` - rollup record key (default: `product_meta`)
//! - `CLOUDBERRY_CART_MAX_ATTEMPTS` - version-conflict retry cap (default: 8)
//! - `CLOUDBERRY_CART_BACKOFF_MS` - base retry backoff (default: 5)
//! - `CLOUDBERRY_CART_BACKOFF_CAP_MS` - max retry backoff (default: 80)
//! - `CLOUDBERRY_PRODUCT_CACHE_CAPACITY` - product cache entries (default: 1000)
//! - `CLOUDBERRY_PRODUCT_CACHE_TTL_SECS` - product cache TTL (default: 300)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Mutation-core configuration.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Store set/record names.
    pub sets: SetNames,
    /// Version-conflict retry policy for cart writes.
    pub retry: RetryPolicy,
    /// Product read cache settings.
    pub product_cache: CacheSettings,
}

/// Names of the sets and shared records the core addresses.
#[derive(Debug, Clone)]
pub struct SetNames {
    /// Immutable catalog entries.
    pub products: String,
    /// Per-user cart documents.
    pub carts: String,
    /// Set holding the shared rollup document.
    pub meta_set: String,
    /// Key of the shared rollup document within `meta_set`.
    pub meta_key: String,
}

impl Default for SetNames {
    fn default() -> Self {
        Self {
            products: "products".to_string(),
            carts: "shopping_carts".to_string(),
            meta_set: "cat_index".to_string(),
            meta_key: "product_meta".to_string(),
        }
    }
}

/// Bounded retry-with-backoff policy for version-conflicted writes.
///
/// The cap rules out livelock under sustained contention; exhausting it
/// surfaces a typed error instead of spinning.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Base delay; doubled each lost attempt.
    pub backoff_base: Duration,
    /// Upper bound on the pre-jitter delay.
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff_base: Duration::from_millis(5),
            backoff_cap: Duration::from_millis(80),
        }
    }
}

/// Product read cache knobs.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub capacity: u64,
    pub time_to_live: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            time_to_live: Duration::from_secs(300),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparseable, or if
    /// the retry cap is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let sets = SetNames {
            products: get_env_or_default("CLOUDBERRY_PRODUCTS_SET", "products"),
            carts: get_env_or_default("CLOUDBERRY_CARTS_SET", "shopping_carts"),
            meta_set: get_env_or_default("CLOUDBERRY_META_SET", "cat_index"),
            meta_key: get_env_or_default("CLOUDBERRY_META_KEY", "product_meta"),
        };

        let max_attempts: u32 = parse_env_or("CLOUDBERRY_CART_MAX_ATTEMPTS", 8)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CLOUDBERRY_CART_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let retry = RetryPolicy {
            max_attempts,
            backoff_base: Duration::from_millis(parse_env_or("CLOUDBERRY_CART_BACKOFF_MS", 5)?),
            backoff_cap: Duration::from_millis(parse_env_or(
                "CLOUDBERRY_CART_BACKOFF_CAP_MS",
                80,
            )?),
        };

        let product_cache = CacheSettings {
            capacity: parse_env_or("CLOUDBERRY_PRODUCT_CACHE_CAPACITY", 1000)?,
            time_to_live: Duration::from_secs(parse_env_or(
                "CLOUDBERRY_PRODUCT_CACHE_TTL_SECS",
                300,
            )?),
        };

        Ok(Self {
            sets,
            retry,
            product_cache,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
