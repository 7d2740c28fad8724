//! Merger error types
//!
//! A remote's last error is latched on its cursor record and surfaced by
//! value through `ready()`/`next_ready()`, so the error type is `Clone`.

use braid_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the results merger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// A response contradicted established cursor state
    #[error("bad value: {0}")]
    BadValue(String),

    /// An internal protocol expectation was violated
    #[error("internal error: {0}")]
    Internal(String),

    /// Method called in a lifecycle state that forbids it
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// The executor reported a remote command failure
    #[error("remote error: {0}")]
    Remote(String),

    /// The response payload could not be decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An in-flight command was canceled
    #[error("remote command canceled")]
    Canceled,

    /// The executor is shutting down and accepts no further work
    #[error("task executor shutting down")]
    ShutdownInProgress,
}

impl MergeError {
    /// Whether this error indicates executor shutdown
    pub fn is_shutdown(&self) -> bool {
        matches!(self, MergeError::ShutdownInProgress)
    }
}

/// Result type for merger operations
pub type Result<T> = std::result::Result<T, MergeError>;
