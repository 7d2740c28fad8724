//! Protocol error types

use thiserror::Error;

/// Errors raised while decoding shard responses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Response envelope was structurally invalid
    #[error("malformed cursor response: {0}")]
    MalformedResponse(String),

    /// The shard reported command failure (`ok: 0`)
    #[error("remote command failed: {0}")]
    CommandFailed(String),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
