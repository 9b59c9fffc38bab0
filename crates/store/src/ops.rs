//! Nested-path operations, write guards, and scan requests.

use serde_json::Value;

use crate::value::{Bins, Version};

/// Path of map keys addressing one nested sub-field of a record.
///
/// The first segment names a bin; each further segment descends into a
/// nested map. `DocPath::root("items").key("10017").key("quantity")`
/// addresses the quantity of one cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<String>);

impl DocPath {
    /// Start a path at a top-level bin.
    #[must_use]
    pub fn root(bin: impl Into<String>) -> Self {
        Self(vec![bin.into()])
    }

    /// Descend one map key deeper.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(key.into());
        self
    }

    /// The path segments, outermost first. Never empty.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl core::fmt::Display for DocPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// One sub-operation of an atomic [`crate::DocumentStore::operate`] call.
///
/// All write variants create missing intermediate maps along their path.
/// The no-fail variants (`SetIfAbsent`, `AppendUnique`, `Remove`) silently
/// do nothing instead of erroring when their precondition does not hold,
/// which is what makes a multi-op request commutative under concurrency.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOp {
    /// Set the value at `path`, overwriting whatever was there.
    Set { path: DocPath, value: Value },
    /// Set the value at `path` only if the key is absent; no-op otherwise.
    SetIfAbsent { path: DocPath, value: Value },
    /// Add `by` to the integer at `path`, creating it at 0 when absent.
    Increment { path: DocPath, by: i64 },
    /// Append to the value-ordered list at `path` unless already present.
    AppendUnique { path: DocPath, value: Value },
    /// Remove the map key at `path`; no-op when absent.
    Remove { path: DocPath },
    /// Empty the container at `path`, creating an empty map when absent.
    Clear { path: DocPath },
    /// Read: the map keys at `path` in ascending order. Contributes one
    /// reply value (an array of strings) to the operate result.
    MapKeys { path: DocPath },
}

impl DocumentOp {
    /// True for variants that can change the record.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::MapKeys { .. })
    }

    /// The path this op addresses.
    #[must_use]
    pub const fn path(&self) -> &DocPath {
        match self {
            Self::Set { path, .. }
            | Self::SetIfAbsent { path, .. }
            | Self::Increment { path, .. }
            | Self::AppendUnique { path, .. }
            | Self::Remove { path }
            | Self::Clear { path }
            | Self::MapKeys { path } => path,
        }
    }
}

/// Precondition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteGuard {
    /// Upsert: create the record when absent, update it when present.
    #[default]
    Upsert,
    /// Fail with `VersionConflict` unless the record exists at exactly this
    /// version.
    ExpectVersion(Version),
    /// Fail with `AlreadyExists` when the record is already present.
    CreateOnly,
}

/// One equality clause over a bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equality {
    pub bin: String,
    pub value: Value,
}

impl Equality {
    /// `bin == value`.
    #[must_use]
    pub fn of(bin: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            bin: bin.into(),
            value: value.into(),
        }
    }

    /// Evaluate this clause against a record.
    #[must_use]
    pub fn matches(&self, bins: &Bins) -> bool {
        bins.get(&self.bin) == Some(&self.value)
    }
}

/// Conjunction of equality clauses evaluated store-side during a scan.
///
/// The empty conjunction is defined as true, so callers never need to pad
/// with trivially-true terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Equality>,
}

impl Predicate {
    /// The always-true predicate.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// AND one more clause onto the conjunction.
    #[must_use]
    pub fn and(mut self, clause: Equality) -> Self {
        self.clauses.push(clause);
        self
    }

    /// The clauses in AND order.
    #[must_use]
    pub fn clauses(&self) -> &[Equality] {
        &self.clauses
    }

    /// True when no clause is present (tautology).
    #[must_use]
    pub fn is_tautology(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the conjunction against a record.
    #[must_use]
    pub fn matches(&self, bins: &Bins) -> bool {
        self.clauses.iter().all(|clause| clause.matches(bins))
    }
}

/// Which bins a read or scan should return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// All bins.
    #[default]
    Full,
    /// Only the named bins.
    Bins(Vec<String>),
    /// No bin data (existence/counting scans).
    NoBins,
}

impl Projection {
    /// Convenience constructor for a named-bin projection.
    #[must_use]
    pub fn bins<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Bins(names.into_iter().map(Into::into).collect())
    }

    /// Apply the projection to a record's bins.
    #[must_use]
    pub fn apply(&self, bins: &Bins) -> Bins {
        match self {
            Self::Full => bins.clone(),
            Self::Bins(names) => names
                .iter()
                .filter_map(|name| bins.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
            Self::NoBins => Bins::new(),
        }
    }
}

/// One secondary-index scan: an optional index-backed equality filter, a
/// residual conjunction evaluated during the scan, a result cap, and a bin
/// projection. With no index filter the scan walks the whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub set: String,
    pub index: Option<Equality>,
    pub residual: Predicate,
    pub limit: Option<usize>,
    pub projection: Projection,
}

impl ScanRequest {
    /// An unfiltered full-projection scan of `set`.
    #[must_use]
    pub fn over(set: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            index: None,
            residual: Predicate::all(),
            limit: None,
            projection: Projection::Full,
        }
    }
}
