//! Shared helpers for the integration test suites.
//!
//! Tests run the mutation core against the in-process store backend. The
//! [`FaultStore`] wrapper additionally injects write conflicts and outages
//! to drive the retry paths deterministically.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)] // test support code

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use serde_json::json;

use cloudberry_catalog::{CartEngine, CatalogConfig, FacetStore, ProductCatalog};
use cloudberry_core::{FacetFact, Price, Product, ProductId};
use cloudberry_store::{
    Bins, DocumentOp, DocumentStore, MemoryStore, Projection, RecordKey, ScanRequest, StoreError,
    Versioned, WriteGuard,
};

/// Initialize test logging once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A store plus the component set built over it.
pub struct Harness<S> {
    pub store: Arc<S>,
    pub config: CatalogConfig,
}

impl Harness<MemoryStore> {
    #[must_use]
    pub fn new() -> Self {
        Self::over(MemoryStore::new(), CatalogConfig::default())
    }
}

impl Default for Harness<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DocumentStore> Harness<S> {
    pub fn over(store: S, config: CatalogConfig) -> Self {
        init_tracing();
        Self {
            store: Arc::new(store),
            config,
        }
    }

    #[must_use]
    pub fn cart_engine(&self) -> CartEngine<S> {
        CartEngine::new(Arc::clone(&self.store), &self.config)
    }

    #[must_use]
    pub fn product_catalog(&self) -> ProductCatalog<S> {
        ProductCatalog::new(Arc::clone(&self.store), &self.config)
    }

    #[must_use]
    pub fn facet_store(&self) -> FacetStore<S> {
        FacetStore::new(Arc::clone(&self.store), &self.config)
    }

    /// Store one product through the catalog write path.
    pub async fn seed_product(&self, product: &Product) {
        self.product_catalog()
            .put_product(product)
            .await
            .expect("seed product");
    }
}

/// A product with enough fields populated to exercise snapshots and scans.
#[must_use]
pub fn sample_product(id: &str, category: &str, brand: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Sample {id}"),
        brand_name: brand.to_string(),
        category: category.to_string(),
        sub_category: "Topwear".to_string(),
        article_type: "Tshirts".to_string(),
        usage: "Casual".to_string(),
        season: "Summer".to_string(),
        gender: "Unisex".to_string(),
        age_group: "Adults-Unisex".to_string(),
        price: Price::from_minor_units(price),
        sale_price: Price::from_minor_units(price),
        images: json!({
            "search": { "resolutions": { "125X161": format!("http://img/{id}-search.jpg") } },
            "front": { "resolutions": { "125X161": format!("http://img/{id}-front.jpg") } },
        }),
        descriptors: Value::Null,
        article_attr: Value::Null,
        colors: vec!["Navy".to_string()],
    }
}

/// One fact as the loader would emit it for [`sample_product`].
#[must_use]
pub fn sample_fact(category: &str, sub_category: &str, brand: &str) -> FacetFact {
    FacetFact {
        category: category.to_string(),
        sub_category: sub_category.to_string(),
        article_type: "Tshirts".to_string(),
        usage: "Casual".to_string(),
        brand_name: brand.to_string(),
    }
}

/// Failures the [`FaultStore`] can inject on `operate` calls.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Version conflict / create race (retriable).
    Conflict,
    /// Store outage (fatal, never retried).
    Outage,
}

/// [`DocumentStore`] wrapper that fails `operate` calls with scripted
/// faults before delegating to an in-memory backend.
#[derive(Default)]
pub struct FaultStore {
    inner: MemoryStore,
    scripted: Mutex<VecDeque<Fault>>,
    operate_calls: AtomicU32,
}

impl FaultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `operate` calls with `fault`, `count` times.
    pub fn inject(&self, fault: Fault, count: usize) {
        let mut scripted = self.scripted.lock();
        for _ in 0..count {
            scripted.push_back(fault);
        }
    }

    /// Number of `operate` calls seen so far, including failed ones.
    #[must_use]
    pub fn operate_calls(&self) -> u32 {
        self.operate_calls.load(Ordering::SeqCst)
    }

    fn next_fault(&self, key: &RecordKey) -> Option<StoreError> {
        self.scripted.lock().pop_front().map(|fault| match fault {
            Fault::Conflict => StoreError::VersionConflict { key: key.clone() },
            Fault::Outage => StoreError::Unavailable {
                reason: "injected outage".to_string(),
            },
        })
    }
}

impl DocumentStore for FaultStore {
    async fn get(
        &self,
        key: &RecordKey,
        projection: &Projection,
    ) -> Result<Option<Versioned<Bins>>, StoreError> {
        self.inner.get(key, projection).await
    }

    async fn put(&self, key: &RecordKey, bins: Bins, guard: WriteGuard) -> Result<(), StoreError> {
        self.inner.put(key, bins, guard).await
    }

    async fn operate(
        &self,
        key: &RecordKey,
        ops: &[DocumentOp],
        guard: WriteGuard,
    ) -> Result<Vec<Value>, StoreError> {
        self.operate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.next_fault(key) {
            return Err(err);
        }
        self.inner.operate(key, ops, guard).await
    }

    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Bins>, StoreError> {
        self.inner.scan(request).await
    }

    async fn create_index(
        &self,
        set: &str,
        bin: &str,
        index_name: &str,
    ) -> Result<(), StoreError> {
        self.inner.create_index(set, bin, index_name).await
    }

    async fn truncate(&self, set: &str) -> Result<(), StoreError> {
        self.inner.truncate(set).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }
}
