//! Record values and version tokens.

use serde::{Deserialize, Serialize};

/// The decoded fields ("bins") of one record.
///
/// `serde_json::Map` keeps keys in ascending order, which gives stored maps
/// the key-ordered behavior the rollup document relies on.
pub type Bins = serde_json::Map<String, serde_json::Value>;

/// Opaque version token returned with every read.
///
/// A conditional write asserts that the record's version is still the one
/// observed at read time; any intervening write invalidates the token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Wrap a raw version counter (backend use).
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded value paired with the version token it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

impl<T> Versioned<T> {
    /// Pair `value` with the version it was read at.
    #[must_use]
    pub const fn new(value: T, version: Version) -> Self {
        Self { value, version }
    }

    /// Map the value while keeping the version token.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            value: f(self.value),
            version: self.version,
        }
    }
}
