//! Query composition: optional equality filters → one index scan.
//!
//! A filter set compiles to at most one physical secondary-index lookup.
//! Filters are visited in a fixed order; the first non-empty one selects
//! the backing index, and every later non-empty one becomes a residual
//! equality clause evaluated by the store during the scan. No filter at
//! all degenerates to an unfiltered scan up to the cap.

use cloudberry_store::{Equality, Predicate, Projection, ScanRequest};

/// Bins returned by index-backed browse queries. Single-key product
/// lookups read full records instead.
pub const BROWSE_BINS: [&str; 4] = ["id", "name", "images", "brandName"];

/// Optional equality filters over the products set.
///
/// `search_text` is accepted for interface compatibility but not
/// index-backed; the composer ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub article_type: Option<String>,
    pub usage: Option<String>,
    pub brand_name: Option<String>,
    pub search_text: Option<String>,
}

impl ProductFilter {
    /// True when no equality filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.equality_filters().iter().all(|(_, v)| v.is_none())
    }

    /// The equality filters in composition order.
    fn equality_filters(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("category", self.category.as_deref()),
            ("articleType", self.article_type.as_deref()),
            ("usage", self.usage.as_deref()),
            ("brandName", self.brand_name.as_deref()),
        ]
    }
}

/// Compile `filter` into one scan request over `set`, capped at `limit`.
///
/// Empty-string filter values count as absent. The residual conjunction of
/// an unfiltered or single-filter request is empty, which the store
/// contract defines as true.
#[must_use]
pub fn compose(set: &str, filter: &ProductFilter, limit: usize) -> ScanRequest {
    let mut index = None;
    let mut residual = Predicate::all();

    for (bin, value) in filter.equality_filters() {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let clause = Equality::of(bin, value);
        if index.is_none() {
            index = Some(clause);
        } else {
            residual = residual.and(clause);
        }
    }

    ScanRequest {
        set: set.to_string(),
        index,
        residual,
        limit: Some(limit),
        projection: Projection::bins(BROWSE_BINS),
    }
}
