//! Document store contract and backends.
//!
//! # Architecture
//!
//! The mutation core never talks to a concrete database; it talks to the
//! [`DocumentStore`] trait. A backend is picked once, at construction time,
//! as a generic parameter - alternate client generations plug in behind the
//! same interface instead of forming an inheritance pair.
//!
//! The contract is deliberately small and matches what the mutation core
//! actually needs from a schemaless key-value store:
//!
//! - read-with-version ([`DocumentStore::get`])
//! - conditional whole-record writes ([`DocumentStore::put`])
//! - atomic nested-path operations ([`DocumentStore::operate`])
//! - equality-filtered secondary-index scans ([`DocumentStore::scan`])
//! - index management and set/record removal
//!
//! [`MemoryStore`] implements the whole contract in-process and is the
//! backend used by the test suite.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod error;
mod key;
mod memory;
mod ops;
mod store;
mod value;

pub use error::StoreError;
pub use key::RecordKey;
pub use memory::MemoryStore;
pub use ops::{DocPath, DocumentOp, Equality, Predicate, Projection, ScanRequest, WriteGuard};
pub use store::DocumentStore;
pub use value::{Bins, Version, Versioned};
