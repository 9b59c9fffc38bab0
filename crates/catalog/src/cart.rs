//! Cart mutation engine.
//!
//! Every mutation is a version-checked read-modify-write against one
//! per-user cart document. Writes touch exactly one nested entry's fields,
//! never the whole document, so concurrent mutations of different products
//! in the same cart cannot clobber each other; concurrent mutations of the
//! same entry are serialized by the version token and the retry loop.
//!
//! The resulting cart returned by each mutation is derived from the
//! pre-write snapshot plus the applied change - no re-read after a
//! successful conditional write.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use cloudberry_core::{Cart, CartItem, Product, ProductId, UserId};
use cloudberry_store::{
    Bins, DocPath, DocumentOp, DocumentStore, Projection, RecordKey, StoreError, WriteGuard,
};

use crate::config::{CatalogConfig, RetryPolicy, SetNames};
use crate::error::{CatalogError, Result};
use crate::retry::with_write_retries;

/// Bin holding the productId → item map inside a cart document.
const ITEMS_BIN: &str = "items";
/// Sub-field of one cart entry updated by quantity mutations.
const QUANTITY_FIELD: &str = "quantity";

/// Optimistic-concurrency cart mutations over one store backend.
pub struct CartEngine<S> {
    store: Arc<S>,
    sets: SetNames,
    retry: RetryPolicy,
}

impl<S> Clone for CartEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sets: self.sets.clone(),
            retry: self.retry,
        }
    }
}

impl<S: DocumentStore> CartEngine<S> {
    /// Create an engine over `store` using the configured set names and
    /// retry policy.
    #[must_use]
    pub fn new(store: Arc<S>, config: &CatalogConfig) -> Self {
        Self {
            store,
            sets: config.sets.clone(),
            retry: config.retry,
        }
    }

    fn cart_key(&self, user_id: &UserId) -> RecordKey {
        RecordKey::new(&self.sets.carts, user_id.as_str())
    }

    fn product_key(&self, product_id: &ProductId) -> RecordKey {
        RecordKey::new(&self.sets.products, product_id.as_str())
    }

    /// Read a user's cart. An absent document is an empty cart, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the document cannot
    /// be decoded.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Cart> {
        match self
            .store
            .get(&self.cart_key(user_id), &Projection::Full)
            .await?
        {
            Some(read) => decode_cart(&read.value),
            None => Ok(Cart::new()),
        }
    }

    /// Add `quantity` units of a product to a user's cart.
    ///
    /// Two concurrent adds for the same (user, product) pair are both
    /// reflected in the final quantity; the loser of the version race
    /// re-reads and retries.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidQuantity`] when `quantity` is zero
    /// - [`CatalogError::ProductNotFound`] when the product does not exist
    /// - [`CatalogError::ConflictRetriesExhausted`] under sustained
    ///   contention beyond the retry budget
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity);
        }

        let product = self.fetch_product(product_id).await?;
        let engine = self.clone();
        let user_id = user_id.clone();
        let product_id = product_id.clone();
        with_write_retries(self.retry, "cart add", async move || {
            engine
                .try_add(&user_id, &product_id, &product, quantity)
                .await
        })
        .await
    }

    /// Set the quantity of a cart entry; `0` removes the entry.
    ///
    /// Version-checked like [`CartEngine::add`]. Setting a quantity for an
    /// item that is not in the cart is a no-op returning the cart
    /// unchanged; an absent cart document yields an empty cart without a
    /// write.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure or when the retry budget is
    /// exhausted.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        with_write_retries(self.retry, "cart set-quantity", async || {
            self.try_set_quantity(user_id, product_id, quantity).await
        })
        .await
    }

    /// Remove a product from a user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure or when the retry budget is
    /// exhausted.
    pub async fn remove(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart> {
        self.set_quantity(user_id, product_id, 0).await
    }

    /// Empty a user's cart.
    ///
    /// The document itself persists with an empty item map, so a later read
    /// sees an empty cart rather than an absent one. Creating-and-clearing
    /// an absent document is valid. Unconditional: whichever of a
    /// concurrent add and a clear reaches the store last wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: &UserId) -> Result<Cart> {
        self.store
            .operate(
                &self.cart_key(user_id),
                &[DocumentOp::Clear {
                    path: DocPath::root(ITEMS_BIN),
                }],
                WriteGuard::Upsert,
            )
            .await?;
        Ok(Cart::new())
    }

    /// One optimistic attempt of an add; conflicts bubble up to the retry
    /// loop, which restarts from the read.
    async fn try_add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        product: &Product,
        quantity: u32,
    ) -> Result<Cart> {
        let key = self.cart_key(user_id);
        match self.store.get(&key, &Projection::Full).await? {
            Some(read) => {
                let version = read.version;
                let mut cart = decode_cart(&read.value)?;
                if let Some(item) = cart.find_item_mut(product_id) {
                    // The entry exists: bump only its quantity sub-field so
                    // sibling fields written concurrently stay intact.
                    item.quantity += quantity;
                    self.store
                        .operate(
                            &key,
                            &[DocumentOp::Increment {
                                path: item_path(product_id).key(QUANTITY_FIELD),
                                by: i64::from(quantity),
                            }],
                            WriteGuard::ExpectVersion(version),
                        )
                        .await?;
                } else {
                    // The document exists but lacks this product: write one
                    // full nested entry.
                    let item = CartItem::from_product(user_id.clone(), product, quantity);
                    let encoded = encode_item(&item)?;
                    cart.insert(item);
                    self.store
                        .operate(
                            &key,
                            &[DocumentOp::Set {
                                path: item_path(product_id),
                                value: encoded,
                            }],
                            WriteGuard::ExpectVersion(version),
                        )
                        .await?;
                }
                Ok(cart)
            }
            None => {
                // First write for this user: create-only, so a concurrent
                // first-write fails loudly and retries instead of being
                // silently overwritten.
                let item = CartItem::from_product(user_id.clone(), product, quantity);
                let encoded = encode_item(&item)?;
                let mut cart = Cart::new();
                cart.insert(item);
                self.store
                    .operate(
                        &key,
                        &[DocumentOp::Set {
                            path: item_path(product_id),
                            value: encoded,
                        }],
                        WriteGuard::CreateOnly,
                    )
                    .await?;
                Ok(cart)
            }
        }
    }

    async fn try_set_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let key = self.cart_key(user_id);
        let Some(read) = self.store.get(&key, &Projection::Full).await? else {
            return Ok(Cart::new());
        };
        let version = read.version;
        let mut cart = decode_cart(&read.value)?;

        if quantity == 0 {
            if cart.remove(product_id).is_some() {
                self.store
                    .operate(
                        &key,
                        &[DocumentOp::Remove {
                            path: item_path(product_id),
                        }],
                        WriteGuard::ExpectVersion(version),
                    )
                    .await?;
            }
            return Ok(cart);
        }

        match cart.find_item_mut(product_id) {
            Some(item) => {
                item.quantity = quantity;
                self.store
                    .operate(
                        &key,
                        &[DocumentOp::Set {
                            path: item_path(product_id).key(QUANTITY_FIELD),
                            value: Value::from(quantity),
                        }],
                        WriteGuard::ExpectVersion(version),
                    )
                    .await?;
                Ok(cart)
            }
            // Quantity updates only apply to items already in the cart;
            // introducing an item goes through add, which snapshots the
            // product.
            None => Ok(cart),
        }
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product> {
        let read = self
            .store
            .get(&self.product_key(product_id), &Projection::Full)
            .await?;
        let Some(read) = read else {
            return Err(CatalogError::ProductNotFound {
                id: product_id.clone(),
            });
        };
        let product =
            serde_json::from_value(Value::Object(read.value)).map_err(StoreError::from)?;
        Ok(product)
    }
}

fn item_path(product_id: &ProductId) -> DocPath {
    DocPath::root(ITEMS_BIN).key(product_id.as_str())
}

fn encode_item(item: &CartItem) -> Result<Value> {
    Ok(serde_json::to_value(item).map_err(StoreError::from)?)
}

/// Decode a cart document's bins into a [`Cart`].
fn decode_cart(bins: &Bins) -> Result<Cart> {
    let mut cart = Cart::new();
    let Some(items) = bins.get(ITEMS_BIN) else {
        return Ok(cart);
    };
    let Value::Object(entries) = items else {
        return Err(CatalogError::Store(StoreError::PathType {
            path: DocPath::root(ITEMS_BIN),
        }));
    };
    for entry in entries.values() {
        let item: CartItem = serde_json::from_value(entry.clone()).map_err(StoreError::from)?;
        cart.insert(item);
    }
    Ok(cart)
}
