//! Cart mutation engine: concurrency, conflict retries, and edge cases.
//!
//! Runs against the in-process store backend; the fault-injecting wrapper
//! drives the retry paths deterministically.

use std::sync::Arc;
use std::time::Duration;

use cloudberry_catalog::{CartEngine, CatalogConfig, CatalogError, RetryPolicy};
use cloudberry_core::{ProductId, UserId};
use cloudberry_integration_tests::{Fault, FaultStore, Harness, sample_product};
use cloudberry_store::{DocumentStore, Projection, RecordKey, StoreError};
use serde_json::json;

fn fast_retry_config(max_attempts: u32) -> CatalogConfig {
    CatalogConfig {
        retry: RetryPolicy {
            max_attempts,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(2),
        },
        ..CatalogConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_adds_for_one_product_lose_no_update() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-race");
    let product = ProductId::new("10017");

    let first = {
        let engine = engine.clone();
        let (user, product) = (user.clone(), product.clone());
        tokio::spawn(async move { engine.add(&user, &product, 3).await })
    };
    let second = {
        let engine = engine.clone();
        let (user, product) = (user.clone(), product.clone());
        tokio::spawn(async move { engine.add(&user, &product, 4).await })
    };

    first.await.expect("join").expect("first add");
    second.await.expect("join").expect("second add");

    let cart = engine.get_cart(&user).await.expect("read cart");
    let entry = cart.find_item(&product).expect("entry present");
    assert_eq!(entry.quantity, 7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_many_concurrent_unit_adds_all_count() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-fanout");
    let product = ProductId::new("10017");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            let (user, product) = (user.clone(), product.clone());
            tokio::spawn(async move { engine.add(&user, &product, 1).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("add");
    }

    let cart = engine.get_cart(&user).await.expect("read cart");
    assert_eq!(cart.find_item(&product).expect("entry").quantity, 16);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_adds_for_different_products_do_not_clobber() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("a-1", "Apparel", "Nike", 500)).await;
    harness.seed_product(&sample_product("b-2", "Footwear", "Adidas", 900)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-two-products");

    let first = {
        let engine = engine.clone();
        let user = user.clone();
        tokio::spawn(async move { engine.add(&user, &ProductId::new("a-1"), 2).await })
    };
    let second = {
        let engine = engine.clone();
        let user = user.clone();
        tokio::spawn(async move { engine.add(&user, &ProductId::new("b-2"), 5).await })
    };
    first.await.expect("join").expect("add a");
    second.await.expect("join").expect("add b");

    let cart = engine.get_cart(&user).await.expect("read cart");
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.find_item(&ProductId::new("a-1")).expect("a").quantity, 2);
    assert_eq!(cart.find_item(&ProductId::new("b-2")).expect("b").quantity, 5);
}

#[tokio::test]
async fn test_add_snapshots_product_fields() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-snapshot");
    let cart = engine.add(&user, &ProductId::new("10017"), 2).await.expect("add");

    let entry = cart.find_item(&ProductId::new("10017")).expect("entry");
    assert_eq!(entry.name, "Sample 10017");
    assert_eq!(entry.brand_name, "Nike");
    assert_eq!(entry.price.minor_units(), 1099);
    assert_eq!(entry.user_id, user);
    assert_eq!(
        entry.image.as_deref(),
        Some("http://img/10017-search.jpg"),
        "image snapshot prefers the search resolution"
    );
    assert_eq!(cart.total().minor_units(), 2198);
    assert_eq!(cart.item_count(), 2);
}

#[tokio::test]
async fn test_set_quantity_zero_removes_the_entry() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-remove");
    let product = ProductId::new("10017");
    engine.add(&user, &product, 2).await.expect("add");

    let cart = engine.set_quantity(&user, &product, 0).await.expect("set 0");
    assert!(cart.find_item(&product).is_none());

    let reread = engine.get_cart(&user).await.expect("reread");
    assert!(reread.find_item(&product).is_none());
    assert!(reread.is_empty());
}

#[tokio::test]
async fn test_set_quantity_touches_only_the_quantity_field() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-set");
    let product = ProductId::new("10017");
    engine.add(&user, &product, 2).await.expect("add");

    let cart = engine.set_quantity(&user, &product, 9).await.expect("set");
    let entry = cart.find_item(&product).expect("entry");
    assert_eq!(entry.quantity, 9);
    assert_eq!(entry.price.minor_units(), 1099);

    // The stored nested entry keeps its snapshot fields.
    let key = RecordKey::new("shopping_carts", "u-set");
    let read = harness
        .store
        .get(&key, &Projection::Full)
        .await
        .expect("store read")
        .expect("record");
    let stored = read.value.get("items").expect("items").get("10017").expect("entry");
    assert_eq!(stored.get("quantity"), Some(&json!(9)));
    assert_eq!(stored.get("brandName"), Some(&json!("Nike")));
    assert_eq!(stored.get("price"), Some(&json!(1099)));
}

#[tokio::test]
async fn test_set_quantity_for_item_not_in_cart_is_a_noop() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-noop");
    engine.add(&user, &ProductId::new("10017"), 1).await.expect("add");

    let cart = engine
        .set_quantity(&user, &ProductId::new("unknown"), 4)
        .await
        .expect("set");
    assert_eq!(cart.len(), 1);
    assert!(cart.find_item(&ProductId::new("unknown")).is_none());
}

#[tokio::test]
async fn test_set_quantity_on_absent_cart_is_empty_without_a_write() {
    let harness = Harness::new();
    let engine = harness.cart_engine();

    let cart = engine
        .set_quantity(&UserId::new("u-ghost"), &ProductId::new("10017"), 3)
        .await
        .expect("set");
    assert!(cart.is_empty());

    let read = harness
        .store
        .get(&RecordKey::new("shopping_carts", "u-ghost"), &Projection::Full)
        .await
        .expect("store read");
    assert!(read.is_none(), "no document should be created");
}

#[tokio::test]
async fn test_clear_leaves_an_empty_mapping_never_absent() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let engine = harness.cart_engine();
    let user = UserId::new("u-clear");
    engine.add(&user, &ProductId::new("10017"), 2).await.expect("add");

    let cart = engine.clear(&user).await.expect("clear");
    assert!(cart.is_empty());

    let reread = engine.get_cart(&user).await.expect("reread");
    assert!(reread.is_empty());

    // The document survives with an empty item map.
    let read = harness
        .store
        .get(&RecordKey::new("shopping_carts", "u-clear"), &Projection::Full)
        .await
        .expect("store read")
        .expect("record persists");
    assert_eq!(read.value.get("items"), Some(&json!({})));
}

#[tokio::test]
async fn test_clear_on_a_user_with_no_cart_succeeds() {
    let harness = Harness::new();
    let engine = harness.cart_engine();

    let cart = engine.clear(&UserId::new("u-fresh")).await.expect("clear");
    assert!(cart.is_empty());

    let reread = engine.get_cart(&UserId::new("u-fresh")).await.expect("reread");
    assert!(reread.is_empty());
}

#[tokio::test]
async fn test_add_with_zero_quantity_is_rejected() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;

    let err = harness
        .cart_engine()
        .add(&UserId::new("u-zero"), &ProductId::new("10017"), 0)
        .await
        .expect_err("zero delta");
    assert!(matches!(err, CatalogError::InvalidQuantity));
}

#[tokio::test]
async fn test_add_for_unknown_product_fails_fatally() {
    let harness = Harness::new();
    let err = harness
        .cart_engine()
        .add(&UserId::new("u-1"), &ProductId::new("does-not-exist"), 1)
        .await
        .expect_err("unknown product");
    assert!(matches!(
        err,
        CatalogError::ProductNotFound { ref id } if id.as_str() == "does-not-exist"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transient_conflicts_are_absorbed_by_the_retry_loop() {
    let store = FaultStore::new();
    seed_product_directly(&store).await;
    let harness = Harness::over(store, fast_retry_config(8));

    harness.store.inject(Fault::Conflict, 2);

    let engine = harness.cart_engine();
    let user = UserId::new("u-transient");
    let cart = engine.add(&user, &ProductId::new("10017"), 3).await.expect("add");
    assert_eq!(cart.find_item(&ProductId::new("10017")).expect("entry").quantity, 3);
}

#[tokio::test(start_paused = true)]
async fn test_sustained_contention_exhausts_the_retry_budget() {
    let store = FaultStore::new();
    seed_product_directly(&store).await;
    let harness = Harness::over(store, fast_retry_config(3));

    harness.store.inject(Fault::Conflict, 32);

    let err = harness
        .cart_engine()
        .add(&UserId::new("u-contended"), &ProductId::new("10017"), 1)
        .await
        .expect_err("exhaustion");
    assert!(matches!(
        err,
        CatalogError::ConflictRetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(harness.store.operate_calls(), 3);
}

#[tokio::test]
async fn test_store_outage_is_fatal_and_never_retried() {
    let store = FaultStore::new();
    seed_product_directly(&store).await;
    let harness = Harness::over(store, fast_retry_config(8));

    harness.store.inject(Fault::Outage, 1);

    let err = harness
        .cart_engine()
        .add(&UserId::new("u-outage"), &ProductId::new("10017"), 1)
        .await
        .expect_err("outage");
    assert!(matches!(
        err,
        CatalogError::Store(StoreError::Unavailable { .. })
    ));
    assert_eq!(harness.store.operate_calls(), 1);
}

/// Seed a product through the raw store, bypassing the catalog (the fault
/// wrapper only scripts `operate`, but this keeps call counts clean).
async fn seed_product_directly(store: &FaultStore) {
    let product = sample_product("10017", "Apparel", "Nike", 1099);
    let value = serde_json::to_value(&product).expect("encode");
    let bins = match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    };
    store
        .put(
            &RecordKey::new("products", "10017"),
            bins,
            cloudberry_store::WriteGuard::CreateOnly,
        )
        .await
        .expect("seed");
}

// Engines share the backend through an Arc; make sure nothing about the
// harness accidentally pins it to one task.
#[tokio::test(flavor = "multi_thread")]
async fn test_engine_is_shareable_across_tasks() {
    let harness = Harness::new();
    harness.seed_product(&sample_product("10017", "Apparel", "Nike", 1099)).await;
    let engine: CartEngine<_> = harness.cart_engine();
    let engine = Arc::new(engine);

    let task = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine.add(&UserId::new("u-share"), &ProductId::new("10017"), 1).await
        })
    };
    task.await.expect("join").expect("add");
}
