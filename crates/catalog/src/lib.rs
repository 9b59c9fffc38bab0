//! Cloudberry Catalog - the data-mutation core.
//!
//! # Architecture
//!
//! Three tightly coupled pieces sit on top of the
//! [`cloudberry_store::DocumentStore`] contract:
//!
//! - [`CartEngine`] - optimistic-concurrency read-modify-write updates to a
//!   per-user nested cart document, retried on version conflict
//! - [`FacetStore`] - idempotent folding of catalog facts into one shared
//!   counter/list rollup document via commutative atomic sub-operations
//! - [`query`] - composition of optional equality filters into a single
//!   secondary-index scan plus a residual conjunction
//!
//! [`ProductCatalog`] is the read side: cached single-key lookups, timed
//! index scans, and index management.
//!
//! Every operation is a blocking sequence of awaited store round trips;
//! concurrency comes only from parallel callers and is coordinated solely
//! through the store's version tokens.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod facets;
pub mod products;
pub mod query;
mod retry;

pub use cart::CartEngine;
pub use config::{CacheSettings, CatalogConfig, ConfigError, RetryPolicy, SetNames};
pub use error::{CatalogError, Result};
pub use facets::FacetStore;
pub use products::{ProductCatalog, ProductSummary, QueryOutcome};
pub use query::ProductFilter;
