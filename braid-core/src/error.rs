//! Core error types

use thiserror::Error;

/// Errors for core type construction and sort-key extraction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Namespace string did not contain a `db.collection` pair
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// A sorted stream document lacked its precomputed sort key
    #[error("missing sort key array {field:?} in document")]
    MissingSortKey {
        /// The conventional sort-key field name
        field: &'static str,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
