use thiserror::Error;

use catalogql_core::DomainError;

use crate::store::StoreError;

/// Failure of a catalog operation, scoped to one request.
///
/// - **NotFound**: the requested product has no row
/// - **Validation**: malformed input (bad id, bad inventory text, negative stock)
/// - **Transaction**: a statement failed inside a write; the transaction was rolled back
/// - **Store**: a read outside any transaction failed
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transaction failed during {operation}: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("read failed during {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl CatalogError {
    /// Wrap a store failure raised inside a write transaction.
    pub fn transaction(operation: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound(_) => CatalogError::NotFound,
            source => CatalogError::Transaction { operation, source },
        }
    }

    pub fn store(operation: &'static str, source: StoreError) -> Self {
        CatalogError::Store { operation, source }
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => CatalogError::Validation(msg),
            DomainError::InvalidId(msg) => CatalogError::Validation(msg),
        }
    }
}
