//! In-process store backend.
//!
//! Implements the full [`DocumentStore`] contract against process memory:
//! versioned records, atomic nested-path operations, an equality index
//! registry, and residual-predicate scans. This is the backend the test
//! suite runs the mutation core against; it exercises the same conflict
//! paths a networked backend would.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::error::StoreError;
use crate::key::RecordKey;
use crate::ops::{DocPath, DocumentOp, Projection, ScanRequest, WriteGuard};
use crate::store::DocumentStore;
use crate::value::{Bins, Version, Versioned};

#[derive(Debug, Clone)]
struct StoredRecord {
    bins: Bins,
    version: u64,
}

/// In-memory [`DocumentStore`] backend.
///
/// Each record carries a monotonically increasing version; any successful
/// write bumps it, which is what conditional writes assert against.
#[derive(Default)]
pub struct MemoryStore {
    /// set name → record id → record
    records: RwLock<HashMap<String, HashMap<String, StoredRecord>>>,
    /// (set name, bin name) → index name
    indexes: RwLock<HashMap<(String, String), String>>,
}

impl MemoryStore {
    /// An empty store with no sets and no indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_guard(
        existing: Option<&StoredRecord>,
        guard: WriteGuard,
        key: &RecordKey,
    ) -> Result<(), StoreError> {
        match guard {
            WriteGuard::Upsert => Ok(()),
            WriteGuard::ExpectVersion(expected) => match existing {
                Some(record) if record.version == expected.as_u64() => Ok(()),
                _ => Err(StoreError::VersionConflict { key: key.clone() }),
            },
            WriteGuard::CreateOnly => {
                if existing.is_some() {
                    Err(StoreError::AlreadyExists { key: key.clone() })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Walk to the map containing the path's final segment.
///
/// Returns `Ok(None)` when an intermediate key is absent and
/// `create_missing` is false. Errs with `PathType` when an intermediate
/// value exists but is not a map.
fn container_for<'a>(
    bins: &'a mut Bins,
    path: &DocPath,
    create_missing: bool,
) -> Result<Option<&'a mut Bins>, StoreError> {
    let Some((_, parents)) = path.segments().split_last() else {
        return Err(StoreError::PathType { path: path.clone() });
    };

    let mut current = bins;
    for segment in parents {
        if create_missing && !current.contains_key(segment.as_str()) {
            current.insert(segment.clone(), Value::Object(Bins::new()));
        }
        match current.get_mut(segment.as_str()) {
            Some(Value::Object(map)) => current = map,
            Some(_) => return Err(StoreError::PathType { path: path.clone() }),
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn last_segment(path: &DocPath) -> Result<&str, StoreError> {
    path.segments()
        .split_last()
        .map(|(last, _)| last.as_str())
        .ok_or_else(|| StoreError::PathType { path: path.clone() })
}

/// Apply one op to a working copy of a record's bins.
///
/// Returns whether the op changed anything. Read ops push their reply onto
/// `replies`.
fn apply_op(bins: &mut Bins, op: &DocumentOp, replies: &mut Vec<Value>) -> Result<bool, StoreError> {
    let path = op.path();
    let last = last_segment(path)?.to_string();

    match op {
        DocumentOp::Set { value, .. } => {
            let container = container_for(bins, path, true)?
                .ok_or_else(|| StoreError::PathType { path: path.clone() })?;
            container.insert(last, value.clone());
            Ok(true)
        }
        DocumentOp::SetIfAbsent { value, .. } => {
            let container = container_for(bins, path, true)?
                .ok_or_else(|| StoreError::PathType { path: path.clone() })?;
            if container.contains_key(&last) {
                Ok(false)
            } else {
                container.insert(last, value.clone());
                Ok(true)
            }
        }
        DocumentOp::Increment { by, .. } => {
            let container = container_for(bins, path, true)?
                .ok_or_else(|| StoreError::PathType { path: path.clone() })?;
            let current = match container.get(&last) {
                None => 0,
                Some(value) => value
                    .as_i64()
                    .ok_or_else(|| StoreError::PathType { path: path.clone() })?,
            };
            container.insert(last, Value::from(current + by));
            Ok(true)
        }
        DocumentOp::AppendUnique { value, .. } => {
            let container = container_for(bins, path, true)?
                .ok_or_else(|| StoreError::PathType { path: path.clone() })?;
            let slot = container
                .entry(last)
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(list) = slot else {
                return Err(StoreError::PathType { path: path.clone() });
            };
            if list.contains(value) {
                return Ok(false);
            }
            // Lists are value-ordered; keep string entries sorted on insert.
            let position = value.as_str().map_or(list.len(), |needle| {
                list.iter()
                    .position(|entry| entry.as_str().is_some_and(|s| s > needle))
                    .unwrap_or(list.len())
            });
            list.insert(position, value.clone());
            Ok(true)
        }
        DocumentOp::Remove { .. } => match container_for(bins, path, false)? {
            Some(container) => Ok(container.remove(&last).is_some()),
            None => Ok(false),
        },
        DocumentOp::Clear { .. } => {
            let container = container_for(bins, path, true)?
                .ok_or_else(|| StoreError::PathType { path: path.clone() })?;
            match container.get_mut(&last) {
                Some(Value::Object(map)) => map.clear(),
                Some(Value::Array(list)) => list.clear(),
                Some(_) => return Err(StoreError::PathType { path: path.clone() }),
                None => {
                    container.insert(last, Value::Object(Bins::new()));
                }
            }
            Ok(true)
        }
        DocumentOp::MapKeys { .. } => {
            let keys = match container_for(bins, path, false)? {
                Some(container) => match container.get(&last) {
                    Some(Value::Object(map)) => {
                        map.keys().map(|k| Value::from(k.clone())).collect()
                    }
                    Some(_) => return Err(StoreError::PathType { path: path.clone() }),
                    None => Vec::new(),
                },
                None => Vec::new(),
            };
            replies.push(Value::Array(keys));
            Ok(false)
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        key: &RecordKey,
        projection: &Projection,
    ) -> Result<Option<Versioned<Bins>>, StoreError> {
        let records = self.records.read();
        Ok(records
            .get(key.set())
            .and_then(|set| set.get(key.id()))
            .map(|record| {
                Versioned::new(projection.apply(&record.bins), Version::new(record.version))
            }))
    }

    async fn put(&self, key: &RecordKey, bins: Bins, guard: WriteGuard) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let set = records.entry(key.set().to_string()).or_default();
        let existing = set.get(key.id());
        Self::check_guard(existing, guard, key)?;

        let version = existing.map_or(1, |record| record.version + 1);
        set.insert(key.id().to_string(), StoredRecord { bins, version });
        trace!(%key, version, "put");
        Ok(())
    }

    async fn operate(
        &self,
        key: &RecordKey,
        ops: &[DocumentOp],
        guard: WriteGuard,
    ) -> Result<Vec<Value>, StoreError> {
        let mut records = self.records.write();
        let set = records.entry(key.set().to_string()).or_default();
        let existing = set.get(key.id());
        Self::check_guard(existing, guard, key)?;

        // Work on a copy so a failing op leaves the record untouched.
        let mut working = existing.map(|record| record.bins.clone()).unwrap_or_default();
        let mut replies = Vec::new();
        let mut mutated = false;
        for op in ops {
            mutated |= apply_op(&mut working, op, &mut replies)?;
        }

        if let Some(record) = set.get_mut(key.id()) {
            if mutated {
                record.bins = working;
                record.version += 1;
            }
        } else if mutated || matches!(guard, WriteGuard::CreateOnly) {
            set.insert(
                key.id().to_string(),
                StoredRecord {
                    bins: working,
                    version: 1,
                },
            );
        }
        trace!(%key, ops = ops.len(), mutated, "operate");
        Ok(replies)
    }

    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Bins>, StoreError> {
        if let Some(index) = &request.index {
            let indexes = self.indexes.read();
            if !indexes.contains_key(&(request.set.clone(), index.bin.clone())) {
                return Err(StoreError::NoIndex {
                    set: request.set.clone(),
                    bin: index.bin.clone(),
                });
            }
        }

        let records = self.records.read();
        let Some(set) = records.get(&request.set) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for record in set.values() {
            if let Some(index) = &request.index
                && !index.matches(&record.bins)
            {
                continue;
            }
            if !request.residual.matches(&record.bins) {
                continue;
            }
            results.push(request.projection.apply(&record.bins));
            if request.limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
        }
        Ok(results)
    }

    async fn create_index(
        &self,
        set: &str,
        bin: &str,
        index_name: &str,
    ) -> Result<(), StoreError> {
        let mut indexes = self.indexes.write();
        let slot = (set.to_string(), bin.to_string());
        if let Some(existing) = indexes.get(&slot) {
            return Err(StoreError::IndexExists {
                set: set.to_string(),
                bin: bin.to_string(),
                index: existing.clone(),
            });
        }
        indexes.insert(slot, index_name.to_string());
        Ok(())
    }

    async fn truncate(&self, set: &str) -> Result<(), StoreError> {
        self.records.write().remove(set);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, StoreError> {
        let mut records = self.records.write();
        Ok(records
            .get_mut(key.set())
            .is_some_and(|set| set.remove(key.id()).is_some()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::ops::{Equality, Predicate};

    fn key(id: &str) -> RecordKey {
        RecordKey::new("things", id)
    }

    fn bins(value: serde_json::Value) -> Bins {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_absent_record_is_none() {
        let store = MemoryStore::new();
        let read = store.get(&key("missing"), &Projection::Full).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_create_only_put_conflicts_on_second_write() {
        let store = MemoryStore::new();
        let k = key("a");
        store
            .put(&k, bins(json!({"v": 1})), WriteGuard::CreateOnly)
            .await
            .unwrap();

        let err = store
            .put(&k, bins(json!({"v": 2})), WriteGuard::CreateOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_expect_version_enforced() {
        let store = MemoryStore::new();
        let k = key("a");
        store
            .put(&k, bins(json!({"v": 1})), WriteGuard::Upsert)
            .await
            .unwrap();
        let read = store.get(&k, &Projection::Full).await.unwrap().unwrap();

        // Matching version succeeds and bumps the version.
        store
            .operate(
                &k,
                &[DocumentOp::Set {
                    path: DocPath::root("v"),
                    value: json!(2),
                }],
                WriteGuard::ExpectVersion(read.version),
            )
            .await
            .unwrap();

        // The old token is now stale.
        let err = store
            .operate(
                &k,
                &[DocumentOp::Set {
                    path: DocPath::root("v"),
                    value: json!(3),
                }],
                WriteGuard::ExpectVersion(read.version),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        // An absent record never matches an expected version.
        let err = store
            .operate(
                &key("missing"),
                &[DocumentOp::Set {
                    path: DocPath::root("v"),
                    value: json!(1),
                }],
                WriteGuard::ExpectVersion(Version::new(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_nested_increment_creates_missing_levels() {
        let store = MemoryStore::new();
        let k = key("meta");
        let path = DocPath::root("categories").key("Apparel").key("Topwear");
        store
            .operate(
                &k,
                &[DocumentOp::Increment {
                    path: path.clone(),
                    by: 1,
                }],
                WriteGuard::Upsert,
            )
            .await
            .unwrap();
        store
            .operate(&k, &[DocumentOp::Increment { path, by: 1 }], WriteGuard::Upsert)
            .await
            .unwrap();

        let read = store.get(&k, &Projection::Full).await.unwrap().unwrap();
        assert_eq!(
            read.value.get("categories").unwrap()["Apparel"]["Topwear"],
            json!(2)
        );
    }

    #[tokio::test]
    async fn test_failed_op_leaves_record_untouched() {
        let store = MemoryStore::new();
        let k = key("a");
        store
            .put(&k, bins(json!({"text": "hello"})), WriteGuard::Upsert)
            .await
            .unwrap();

        // Second op hits a type error; the first op must not stick.
        let err = store
            .operate(
                &k,
                &[
                    DocumentOp::Set {
                        path: DocPath::root("other"),
                        value: json!(1),
                    },
                    DocumentOp::Increment {
                        path: DocPath::root("text"),
                        by: 1,
                    },
                ],
                WriteGuard::Upsert,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PathType { .. }));

        let read = store.get(&k, &Projection::Full).await.unwrap().unwrap();
        assert!(read.value.get("other").is_none());
        assert_eq!(read.version, Version::new(1));
    }

    #[tokio::test]
    async fn test_append_unique_is_an_ordered_set() {
        let store = MemoryStore::new();
        let k = key("meta");
        for brand in ["Nike", "Adidas", "Nike", "Puma"] {
            store
                .operate(
                    &k,
                    &[DocumentOp::AppendUnique {
                        path: DocPath::root("brandNames"),
                        value: json!(brand),
                    }],
                    WriteGuard::Upsert,
                )
                .await
                .unwrap();
        }

        let read = store.get(&k, &Projection::Full).await.unwrap().unwrap();
        assert_eq!(
            read.value.get("brandNames").unwrap(),
            &json!(["Adidas", "Nike", "Puma"])
        );
    }

    #[tokio::test]
    async fn test_map_keys_come_back_ascending() {
        let store = MemoryStore::new();
        let k = key("meta");
        for category in ["Footwear", "Accessories", "Apparel"] {
            store
                .operate(
                    &k,
                    &[DocumentOp::SetIfAbsent {
                        path: DocPath::root("categories").key(category),
                        value: json!({}),
                    }],
                    WriteGuard::Upsert,
                )
                .await
                .unwrap();
        }

        let replies = store
            .operate(
                &k,
                &[DocumentOp::MapKeys {
                    path: DocPath::root("categories"),
                }],
                WriteGuard::Upsert,
            )
            .await
            .unwrap();
        assert_eq!(
            replies,
            vec![json!(["Accessories", "Apparel", "Footwear"])]
        );
    }

    #[tokio::test]
    async fn test_map_keys_on_absent_record_is_empty() {
        let store = MemoryStore::new();
        let replies = store
            .operate(
                &key("missing"),
                &[DocumentOp::MapKeys {
                    path: DocPath::root("categories"),
                }],
                WriteGuard::Upsert,
            )
            .await
            .unwrap();
        assert_eq!(replies, vec![json!([])]);

        // A read-only operate must not materialize the record.
        let read = store.get(&key("missing"), &Projection::Full).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_clear_creates_empty_map_on_fresh_record() {
        let store = MemoryStore::new();
        let k = key("cart");
        store
            .operate(
                &k,
                &[DocumentOp::Clear {
                    path: DocPath::root("items"),
                }],
                WriteGuard::Upsert,
            )
            .await
            .unwrap();

        let read = store.get(&k, &Projection::Full).await.unwrap().unwrap();
        assert_eq!(read.value.get("items").unwrap(), &json!({}));
    }

    #[tokio::test]
    async fn test_scan_requires_an_index() {
        let store = MemoryStore::new();
        let mut request = ScanRequest::over("products");
        request.index = Some(Equality::of("category", "Apparel"));

        let err = store.scan(&request).await.unwrap_err();
        assert!(matches!(err, StoreError::NoIndex { .. }));
    }

    #[tokio::test]
    async fn test_scan_filters_projects_and_limits() {
        let store = MemoryStore::new();
        store
            .create_index("products", "category", "category_idx")
            .await
            .unwrap();

        for (id, category, brand) in [
            ("1", "Apparel", "Nike"),
            ("2", "Apparel", "Adidas"),
            ("3", "Footwear", "Adidas"),
            ("4", "Apparel", "Adidas"),
        ] {
            store
                .put(
                    &RecordKey::new("products", id),
                    bins(json!({"id": id, "category": category, "brandName": brand, "price": 10})),
                    WriteGuard::CreateOnly,
                )
                .await
                .unwrap();
        }

        let request = ScanRequest {
            set: "products".to_string(),
            index: Some(Equality::of("category", "Apparel")),
            residual: Predicate::all().and(Equality::of("brandName", "Adidas")),
            limit: Some(1),
            projection: Projection::bins(["id", "brandName"]),
        };
        let results = store.scan(&request).await.unwrap();
        assert_eq!(results.len(), 1);
        let record = &results[0];
        assert_eq!(record.get("brandName").unwrap(), &json!("Adidas"));
        assert!(!record.contains_key("price"));
    }

    #[tokio::test]
    async fn test_duplicate_index_creation_errors() {
        let store = MemoryStore::new();
        store
            .create_index("products", "usage", "usage_idx")
            .await
            .unwrap();
        let err = store
            .create_index("products", "usage", "usage_idx")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexExists { .. }));
    }

    #[tokio::test]
    async fn test_truncate_and_delete() {
        let store = MemoryStore::new();
        let k = key("a");
        store
            .put(&k, bins(json!({"v": 1})), WriteGuard::Upsert)
            .await
            .unwrap();

        assert!(store.delete(&k).await.unwrap());
        assert!(!store.delete(&k).await.unwrap());

        store
            .put(&k, bins(json!({"v": 1})), WriteGuard::Upsert)
            .await
            .unwrap();
        store.truncate("things").await.unwrap();
        assert!(store.get(&k, &Projection::Full).await.unwrap().is_none());
    }
}
