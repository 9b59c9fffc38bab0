//! Per-user shopping cart.
//!
//! A [`Cart`] is a mapping from product ID to [`CartItem`], keyed by product
//! ID. An empty cart is a valid state distinct from "no cart document yet";
//! both present as an empty mapping to callers. Removing an item means its
//! absence from the mapping, never a zero quantity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::{Price, ProductId, UserId};

/// One cart entry: a product snapshot plus a quantity.
///
/// `name`, `brandName`, `price`, and `image` are snapshots taken when the
/// item was first added; later catalog changes do not flow into open carts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub brand_name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub user_id: UserId,
}

impl CartItem {
    /// Snapshot a product into a new cart entry for `user_id`.
    #[must_use]
    pub fn from_product(user_id: UserId, product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            brand_name: product.brand_name.clone(),
            price: product.price,
            quantity,
            image: product.cart_image_url(),
            user_id,
        }
    }

    /// Line total for this entry.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A user's shopping cart: product ID → cart item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: HashMap<ProductId, CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, keyed by its own product ID.
    ///
    /// Replaces any existing entry for the same product.
    pub fn insert(&mut self, item: CartItem) {
        self.items.insert(item.product_id.clone(), item);
    }

    /// Look up an entry by product ID.
    #[must_use]
    pub fn find_item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.get(product_id)
    }

    /// Mutable lookup, used when folding a quantity delta into a snapshot.
    pub fn find_item_mut(&mut self, product_id: &ProductId) -> Option<&mut CartItem> {
        self.items.get_mut(product_id)
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartItem> {
        self.items.remove(product_id)
    }

    /// Iterate the entries in no particular order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the cart holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price * quantity` over all entries.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items
            .values()
            .fold(Price::ZERO, |acc, item| acc.plus(item.line_total()))
    }

    /// Sum of quantities over all entries.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.values().map(|item| u64::from(item.quantity)).sum()
    }
}
