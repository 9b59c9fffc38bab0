//! Product read side: single-key lookups, index-backed browse queries, and
//! index management.
//!
//! Products are immutable after write, so single-key lookups are cached
//! (5-minute TTL). Cart and rollup documents are mutable state and are
//! never cached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use cloudberry_core::{Product, ProductId};
use cloudberry_store::{
    Bins, DocumentStore, Equality, Predicate, Projection, RecordKey, ScanRequest, StoreError,
    WriteGuard,
};

use crate::config::{CatalogConfig, SetNames};
use crate::error::Result;
use crate::query::{self, BROWSE_BINS, ProductFilter};

/// String secondary indexes created over the products set: bin → index name.
const PRODUCT_INDEXES: [(&str, &str); 7] = [
    ("category", "cat_idx"),
    ("subCategory", "subCat_idx"),
    ("articleType", "article_idx"),
    ("usage", "usage_idx"),
    ("brandName", "brand_idx"),
    ("gender", "gender_idx"),
    ("season", "season_idx"),
];

/// The projected view returned by browse queries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub brand_name: String,
    pub images: Value,
}

impl Default for ProductSummary {
    fn default() -> Self {
        Self {
            id: ProductId::new(""),
            name: String::new(),
            brand_name: String::new(),
            images: Value::Null,
        }
    }
}

/// Scan results plus the end-to-end execution time of the scan.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub products: Vec<ProductSummary>,
    pub elapsed: Duration,
}

/// Catalog reads and loader-side product writes over one store backend.
pub struct ProductCatalog<S> {
    store: Arc<S>,
    sets: SetNames,
    cache: Cache<String, Product>,
}

impl<S> Clone for ProductCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sets: self.sets.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: DocumentStore> ProductCatalog<S> {
    /// Create a catalog over `store` with the configured cache settings.
    #[must_use]
    pub fn new(store: Arc<S>, config: &CatalogConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.product_cache.capacity)
            .time_to_live(config.product_cache.time_to_live)
            .build();
        Self {
            store,
            sets: config.sets.clone(),
            cache,
        }
    }

    fn product_key(&self, product_id: &ProductId) -> RecordKey {
        RecordKey::new(&self.sets.products, product_id.as_str())
    }

    /// Key-value lookup of one product. Absence is `None`, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the record cannot be
    /// decoded.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        if let Some(product) = self.cache.get(product_id.as_str()).await {
            debug!("cache hit for product");
            return Ok(Some(product));
        }

        let Some(read) = self
            .store
            .get(&self.product_key(product_id), &Projection::Full)
            .await?
        else {
            return Ok(None);
        };
        let product: Product =
            serde_json::from_value(Value::Object(read.value)).map_err(StoreError::from)?;

        self.cache
            .insert(product_id.as_str().to_string(), product.clone())
            .await;
        Ok(Some(product))
    }

    /// Read a single bin of one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn product_attribute(
        &self,
        product_id: &ProductId,
        attribute: &str,
    ) -> Result<Option<Value>> {
        let read = self
            .store
            .get(&self.product_key(product_id), &Projection::bins([attribute]))
            .await?;
        Ok(read.and_then(|r| r.value.get(attribute).cloned()))
    }

    /// Store one immutable catalog record (create-only).
    ///
    /// # Errors
    ///
    /// Returns an error if the record already exists or the store is
    /// unreachable.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn put_product(&self, product: &Product) -> Result<()> {
        let value = serde_json::to_value(product).map_err(StoreError::from)?;
        let bins: Bins = serde_json::from_value(value).map_err(StoreError::from)?;
        self.store
            .put(&self.product_key(&product.id), bins, WriteGuard::CreateOnly)
            .await?;
        self.cache.invalidate(product.id.as_str()).await;
        Ok(())
    }

    /// Single secondary-index browse: `bin == value`, capped at `limit`,
    /// with the fixed browse projection. Timed end to end.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist or the store is
    /// unreachable.
    #[instrument(skip(self))]
    pub async fn browse(&self, bin: &str, value: &str, limit: usize) -> Result<QueryOutcome> {
        self.run_scan(ScanRequest {
            set: self.sets.products.clone(),
            index: Some(Equality::of(bin, value)),
            residual: Predicate::all(),
            limit: Some(limit),
            projection: Projection::bins(BROWSE_BINS),
        })
        .await
    }

    /// Multi-filter search composed into one index scan plus a residual
    /// conjunction. Timed end to end.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index does not exist or the store is
    /// unreachable.
    #[instrument(skip(self, filter))]
    pub async fn search(&self, filter: &ProductFilter, limit: usize) -> Result<QueryOutcome> {
        self.run_scan(query::compose(&self.sets.products, filter, limit))
            .await
    }

    /// Number of records in the products set (no bin data transferred).
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn product_count(&self) -> Result<usize> {
        let mut request = ScanRequest::over(self.sets.products.clone());
        request.projection = Projection::NoBins;
        Ok(self.store.scan(&request).await?.len())
    }

    /// Create the string secondary indexes browse queries rely on.
    ///
    /// Safe to call repeatedly: an index that already exists is logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> Result<()> {
        for (bin, index_name) in PRODUCT_INDEXES {
            match self
                .store
                .create_index(&self.sets.products, bin, index_name)
                .await
            {
                Ok(()) => {}
                Err(StoreError::IndexExists { .. }) => {
                    debug!(index = index_name, "index already exists");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Wipe all catalog state: products, carts, and the shared rollup
    /// record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        self.store.truncate(&self.sets.products).await?;
        self.store.truncate(&self.sets.carts).await?;
        self.store
            .delete(&RecordKey::new(&self.sets.meta_set, &self.sets.meta_key))
            .await?;
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn run_scan(&self, request: ScanRequest) -> Result<QueryOutcome> {
        let started = Instant::now();
        let records = self.store.scan(&request).await?;
        let products = records
            .into_iter()
            .map(|bins| serde_json::from_value(Value::Object(bins)))
            .collect::<std::result::Result<Vec<ProductSummary>, _>>()
            .map_err(StoreError::from)?;
        Ok(QueryOutcome {
            products,
            elapsed: started.elapsed(),
        })
    }
}
