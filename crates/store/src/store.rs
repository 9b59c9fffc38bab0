//! The document store contract.

use serde_json::Value;

use crate::error::StoreError;
use crate::key::RecordKey;
use crate::ops::{DocumentOp, Projection, ScanRequest, WriteGuard};
use crate::value::{Bins, Versioned};

/// Contract between the mutation core and a schemaless key-value store.
///
/// A backend is chosen once, at construction time, as a generic parameter;
/// the trait is never boxed, so plain `async fn` methods are fine here.
///
/// Semantics every backend must honor:
///
/// - `get` returns `Ok(None)` for absent records; absence is not an error.
/// - `operate` applies its whole op list atomically - on any failure the
///   record is left untouched, partial application is never observable.
/// - Write guards: [`WriteGuard::ExpectVersion`] fails with
///   [`StoreError::VersionConflict`] on any mismatch (including an absent
///   record); [`WriteGuard::CreateOnly`] fails with
///   [`StoreError::AlreadyExists`] when the record is present.
/// - A scan with an index filter requires a previously created index on
///   that bin and additionally applies the residual conjunction, the limit,
///   and the projection. Result order is unspecified.
#[allow(async_fn_in_trait)] // backends are generics, never trait objects
pub trait DocumentStore: Send + Sync + 'static {
    /// Read a record with its version token, applying `projection`.
    async fn get(
        &self,
        key: &RecordKey,
        projection: &Projection,
    ) -> Result<Option<Versioned<Bins>>, StoreError>;

    /// Replace a record's bins wholesale under `guard`.
    async fn put(&self, key: &RecordKey, bins: Bins, guard: WriteGuard) -> Result<(), StoreError>;

    /// Apply `ops` atomically to one record under `guard`.
    ///
    /// Returns one reply value per read op, in op order.
    async fn operate(
        &self,
        key: &RecordKey,
        ops: &[DocumentOp],
        guard: WriteGuard,
    ) -> Result<Vec<Value>, StoreError>;

    /// Run one equality scan.
    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Bins>, StoreError>;

    /// Create a string secondary index over `bin` in `set`.
    async fn create_index(&self, set: &str, bin: &str, index_name: &str)
    -> Result<(), StoreError>;

    /// Remove every record in `set`.
    async fn truncate(&self, set: &str) -> Result<(), StoreError>;

    /// Delete one record; returns whether it existed.
    async fn delete(&self, key: &RecordKey) -> Result<bool, StoreError>;
}
