//! Category aggregation facts and their rolled-up view.
//!
//! Every catalog-load event emits one [`FacetFact`] per product; the facts
//! are folded into a single shared rollup document. [`CategoryRollup`] is the
//! decoded read-side view of that document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder used by the catalog source for "no value".
pub const NA_SENTINEL: &str = "NA";

/// One observation folded into the shared rollup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetFact {
    pub category: String,
    pub sub_category: String,
    pub article_type: String,
    pub usage: String,
    pub brand_name: String,
}

/// Decoded view of the shared rollup document.
///
/// `categories` maps category → subcategory → occurrence count; the nested
/// maps are key-ordered like the stored document. The three string lists are
/// value-ordered sets (duplicates suppressed at write time).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRollup {
    pub categories: BTreeMap<String, BTreeMap<String, i64>>,
    pub article_types: Vec<String>,
    pub usage: Vec<String>,
    pub brand_names: Vec<String>,
}

/// True for values worth surfacing to callers: non-empty and not the
/// catalog's `"NA"` placeholder.
#[must_use]
pub fn is_meaningful(value: &str) -> bool {
    !value.is_empty() && value != NA_SENTINEL
}
