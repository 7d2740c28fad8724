//! Shard endpoint identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A shard endpoint (`host:port`) that getMore and killCursors commands are
/// directed at.
///
/// Braid does not resolve or validate the address; it is an opaque routing
/// token handed to the task executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardHost(String);

impl ShardHost {
    /// Create a shard host from a `host:port` string
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    /// The address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShardHost {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ShardHost {
    fn from(s: String) -> Self {
        Self(s)
    }
}
