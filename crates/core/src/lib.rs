//! Cloudberry Core - Shared types library.
//!
//! This crate provides the domain types used across all Cloudberry Market
//! components:
//! - `store` - Document store contract and backends
//! - `catalog` - Cart mutation, facet aggregation, and product queries
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices
//! - [`product`] - Immutable catalog entries
//! - [`cart`] - Per-user shopping cart and cart items
//! - [`facet`] - Category/brand facts folded into the shared rollup record

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod facet;
pub mod product;
pub mod types;

pub use cart::{Cart, CartItem};
pub use facet::{CategoryRollup, FacetFact};
pub use product::Product;
pub use types::*;
