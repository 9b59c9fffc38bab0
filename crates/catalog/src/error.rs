//! Catalog-level error handling.
//!
//! Retriable store failures (version conflicts, create races) never cross
//! this boundary; the cart engine resolves them internally or reports
//! [`CatalogError::ConflictRetriesExhausted`]. Everything else carries the
//! failing operation's context for the caller to act on.

use thiserror::Error;

use cloudberry_core::ProductId;
use cloudberry_store::StoreError;

/// Errors surfaced by the mutation core.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A cart mutation referenced a product the catalog does not hold.
    #[error("product not found: {id}")]
    ProductNotFound { id: ProductId },

    /// A cart add was called with a non-positive quantity delta.
    #[error("quantity delta must be positive")]
    InvalidQuantity,

    /// A version-checked write kept losing to concurrent writers.
    #[error("{operation} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        operation: &'static str,
        attempts: u32,
    },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::ProductNotFound {
            id: ProductId::new("10017"),
        };
        assert_eq!(err.to_string(), "product not found: 10017");

        let err = CatalogError::ConflictRetriesExhausted {
            operation: "cart add",
            attempts: 8,
        };
        assert_eq!(err.to_string(), "cart add still conflicting after 8 attempts");
    }
}
