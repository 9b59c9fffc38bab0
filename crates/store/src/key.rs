//! Record addressing.

/// Address of one record: a set (collection) name plus a record ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    set: String,
    id: String,
}

impl RecordKey {
    /// Create a key for `id` in `set`.
    #[must_use]
    pub fn new(set: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            id: id.into(),
        }
    }

    /// The set (collection) this key addresses.
    #[must_use]
    pub fn set(&self) -> &str {
        &self.set
    }

    /// The record ID within the set.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.set, self.id)
    }
}
