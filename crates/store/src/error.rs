//! Store failure taxonomy.

use thiserror::Error;

use crate::key::RecordKey;
use crate::ops::DocPath;

/// Errors surfaced by a [`crate::DocumentStore`] backend.
///
/// Only [`StoreError::VersionConflict`] and the create-only flavor of
/// [`StoreError::AlreadyExists`] are retriable; everything else is fatal to
/// the operation that hit it. Absent records are never an error - reads
/// return `None` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write observed a version other than the expected one.
    #[error("version conflict on {key}")]
    VersionConflict { key: RecordKey },

    /// A create-only write found the record already present.
    #[error("record already exists: {key}")]
    AlreadyExists { key: RecordKey },

    /// An index for this set/bin pair already exists.
    #[error("index {index} already exists on {set}.{bin}")]
    IndexExists {
        set: String,
        bin: String,
        index: String,
    },

    /// An equality scan asked for an index that was never created.
    #[error("no index on {set}.{bin} to back an equality scan")]
    NoIndex { set: String, bin: String },

    /// A nested-path operation addressed a value of the wrong shape.
    #[error("operation at {path} does not match the stored value's type")]
    PathType { path: DocPath },

    /// The store could not be reached or timed out. Never retried by the
    /// mutation core.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Record encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures that a version-checked read-modify-write loop may
    /// resolve by re-reading and retrying.
    #[must_use]
    pub const fn is_write_conflict(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. } | Self::AlreadyExists { .. }
        )
    }
}
