//! Immutable catalog entries.
//!
//! A [`Product`] is written once by the catalog loader and never mutated by
//! the mutation core. Field names follow the stored bin names (camelCase),
//! which in turn follow the upstream catalog source format.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// The image resolution snapshotted into carts.
const CART_IMAGE_RESOLUTION: &str = "125X161";

/// One catalog entry.
///
/// `images`, `descriptors`, and `articleAttr` are free-form nested documents
/// carried through from the catalog source; the core never interprets them
/// beyond [`Product::cart_image_url`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand_name: String,
    pub category: String,
    pub sub_category: String,
    pub article_type: String,
    pub usage: String,
    pub season: String,
    pub gender: String,
    pub age_group: String,
    pub price: Price,
    pub sale_price: Price,
    /// Nested image-resolution map, e.g. `images.search.resolutions.125X161`.
    pub images: serde_json::Value,
    /// Free-form descriptor documents (description, materials, care).
    pub descriptors: serde_json::Value,
    /// Free-form attribute map.
    pub article_attr: serde_json::Value,
    pub colors: Vec<String>,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: ProductId::new(""),
            name: String::new(),
            brand_name: String::new(),
            category: String::new(),
            sub_category: String::new(),
            article_type: String::new(),
            usage: String::new(),
            season: String::new(),
            gender: String::new(),
            age_group: String::new(),
            price: Price::ZERO,
            sale_price: Price::ZERO,
            images: serde_json::Value::Null,
            descriptors: serde_json::Value::Null,
            article_attr: serde_json::Value::Null,
            colors: Vec::new(),
        }
    }
}

impl Product {
    /// The image URL snapshotted into cart items.
    ///
    /// Tries `search/resolutions/125X161` first, then falls back to
    /// `front/resolutions/125X161`. Returns `None` when neither path holds a
    /// string.
    #[must_use]
    pub fn cart_image_url(&self) -> Option<String> {
        Self::image_at(&self.images, "search")
            .or_else(|| Self::image_at(&self.images, "front"))
            .map(str::to_string)
    }

    fn image_at<'a>(images: &'a serde_json::Value, group: &str) -> Option<&'a str> {
        images
            .get(group)?
            .get("resolutions")?
            .get(CART_IMAGE_RESOLUTION)?
            .as_str()
    }
}
