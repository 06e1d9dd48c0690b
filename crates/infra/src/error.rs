//! Catalog operation outcomes.

use thiserror::Error;

use forgecart_core::DomainError;

use crate::store::StoreError;

/// Error returned by every catalog operation.
///
/// - **Validation**: malformed input; no transaction was opened.
/// - **Conflict**: a unique key is taken (pre-check or constraint); the
///   transaction was rolled back.
/// - **NotFound**: target missing or already archived.
/// - **Storage**: any other store failure; the transaction was rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl CatalogError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                CatalogError::Validation(msg)
            }
            DomainError::Conflict(msg) => CatalogError::Conflict(msg),
            DomainError::NotFound(msg) => CatalogError::NotFound(msg),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UniqueViolation { constraint } => {
                CatalogError::Conflict(format!("{constraint} already taken"))
            }
            StoreError::RowNotFound(msg) => CatalogError::NotFound(msg),
            other => CatalogError::Storage(other),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
