//! # Dispatch Errors
//!
//! Error types for the collection dispatch layer.

use thiserror::Error;

use crate::schema::{SchemaError, SchemaErrorCode};

/// Result type for document store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures reported by a document store client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store refused or failed the operation
    #[error("Store operation failed: {0}")]
    OperationFailed(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`Collection`](super::Collection) operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Document or update does not fit the schema
    #[error("{0}")]
    Validation(SchemaError),

    /// Targeted operation without the full shard key
    #[error("{0}")]
    GlobalQuery(SchemaError),

    /// Operation that would silently do the wrong thing, such as saving a
    /// document twice
    #[error("{0}")]
    UnsafeBehavior(String),

    /// find-and-modify matched no document
    #[error("{0}")]
    ModifyFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    /// The underlying schema error, for validation and sharding failures
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            DispatchError::Validation(err) | DispatchError::GlobalQuery(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for DispatchError {
    fn from(err: SchemaError) -> Self {
        match err.code() {
            SchemaErrorCode::DgGlobalQuery => DispatchError::GlobalQuery(err),
            _ => DispatchError::Validation(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_split_by_code() {
        let err: DispatchError = SchemaError::global_query(&["region"]).into();
        assert!(matches!(err, DispatchError::GlobalQuery(_)));

        let err: DispatchError = SchemaError::validation("Missing required field(s) 'a'").into();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(err.to_string(), "Missing required field(s) 'a'");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: DispatchError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err.to_string(), "Store unavailable: connection refused");
        assert!(err.schema_error().is_none());
    }
}
