//! Category aggregation over one shared rollup document.
//!
//! Every catalog-load event folds one [`FacetFact`] into the shared record
//! as a single atomic multi-op request. Each sub-operation is individually
//! conflict-free (create-only no-fail, increment, add-unique no-fail), so
//! the fold needs no version check and no retry: concurrent loads commute.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::instrument;

use cloudberry_core::facet::is_meaningful;
use cloudberry_core::{CategoryRollup, FacetFact};
use cloudberry_store::{
    DocPath, DocumentOp, DocumentStore, Projection, RecordKey, StoreError, WriteGuard,
};

use crate::config::{CatalogConfig, SetNames};
use crate::error::Result;

const CATEGORIES_BIN: &str = "categories";
const ARTICLE_TYPES_BIN: &str = "articleTypes";
const USAGE_BIN: &str = "usage";
const BRAND_NAMES_BIN: &str = "brandNames";

/// Reader/writer for the shared category rollup document.
pub struct FacetStore<S> {
    store: Arc<S>,
    sets: SetNames,
}

impl<S> Clone for FacetStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sets: self.sets.clone(),
        }
    }
}

impl<S: DocumentStore> FacetStore<S> {
    /// Create a facet store over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, config: &CatalogConfig) -> Self {
        Self {
            store,
            sets: config.sets.clone(),
        }
    }

    fn rollup_key(&self) -> RecordKey {
        RecordKey::new(&self.sets.meta_set, &self.sets.meta_key)
    }

    /// Fold one fact into the shared rollup record.
    ///
    /// One atomic request performs all five sub-operations; partial
    /// application is never observable. The subcategory counter increments
    /// on every call, while the three lists suppress duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    #[instrument(skip(self), fields(category = %fact.category, sub_category = %fact.sub_category))]
    pub async fn register_facts(&self, fact: &FacetFact) -> Result<()> {
        let ops = [
            // Make sure the category sub-map exists; silently keep an
            // existing one.
            DocumentOp::SetIfAbsent {
                path: DocPath::root(CATEGORIES_BIN).key(&fact.category),
                value: json!({}),
            },
            // Count this subcategory occurrence within the category.
            DocumentOp::Increment {
                path: DocPath::root(CATEGORIES_BIN)
                    .key(&fact.category)
                    .key(&fact.sub_category),
                by: 1,
            },
            DocumentOp::AppendUnique {
                path: DocPath::root(ARTICLE_TYPES_BIN),
                value: Value::from(fact.article_type.clone()),
            },
            DocumentOp::AppendUnique {
                path: DocPath::root(USAGE_BIN),
                value: Value::from(fact.usage.clone()),
            },
            DocumentOp::AppendUnique {
                path: DocPath::root(BRAND_NAMES_BIN),
                value: Value::from(fact.brand_name.clone()),
            },
        ];
        self.store
            .operate(&self.rollup_key(), &ops, WriteGuard::Upsert)
            .await?;
        Ok(())
    }

    /// All category names, in ascending lexicographic order.
    ///
    /// A key-range read over the whole `categories` map key space.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>> {
        let replies = self
            .store
            .operate(
                &self.rollup_key(),
                &[DocumentOp::MapKeys {
                    path: DocPath::root(CATEGORIES_BIN),
                }],
                WriteGuard::Upsert,
            )
            .await?;
        let keys = replies.into_iter().next().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(keys).map_err(StoreError::from)?)
    }

    /// Distinct article types, without empty/placeholder values.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn article_types(&self) -> Result<Vec<String>> {
        self.string_list(ARTICLE_TYPES_BIN).await
    }

    /// Distinct usage types, without empty/placeholder values.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn usage_types(&self) -> Result<Vec<String>> {
        self.string_list(USAGE_BIN).await
    }

    /// Distinct brand names, without empty/placeholder values.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn brand_names(&self) -> Result<Vec<String>> {
        self.string_list(BRAND_NAMES_BIN).await
    }

    /// The whole rollup document, decoded. Absent → empty rollup.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the document cannot
    /// be decoded.
    pub async fn rollup(&self) -> Result<CategoryRollup> {
        match self.store.get(&self.rollup_key(), &Projection::Full).await? {
            Some(read) => Ok(serde_json::from_value(Value::Object(read.value))
                .map_err(StoreError::from)?),
            None => Ok(CategoryRollup::default()),
        }
    }

    /// Drop the shared rollup record entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn reset(&self) -> Result<()> {
        self.store.delete(&self.rollup_key()).await?;
        Ok(())
    }

    async fn string_list(&self, bin: &str) -> Result<Vec<String>> {
        let read = self
            .store
            .get(&self.rollup_key(), &Projection::bins([bin]))
            .await?;
        let Some(read) = read else {
            return Ok(Vec::new());
        };
        let values: Vec<String> = match read.value.get(bin) {
            Some(list) => serde_json::from_value(list.clone()).map_err(StoreError::from)?,
            None => Vec::new(),
        };
        Ok(values
            .into_iter()
            .filter(|value| is_meaningful(value))
            .collect())
    }
}
