//! # Braid Core
//!
//! Shared vocabulary for the braid results merger.
//!
//! This crate provides:
//! - [`Namespace`] and [`ShardHost`] identifiers for remote cursors
//! - [`SortSpec`] describing the requested cross-shard ordering
//! - [`SortKey`] extraction and total ordering over precomputed sort keys
//! - The core error type shared by the protocol and merge crates
//!
//! Documents are plain [`serde_json::Value`] objects throughout. When a
//! stream is sorted, every document carries its merge key as an array under
//! [`SORT_KEY_FIELD`], projected upstream by the shard that produced it.

pub mod error;
pub mod host;
pub mod namespace;
pub mod sort;
pub mod sort_key;

pub use error::{CoreError, Result};
pub use host::ShardHost;
pub use namespace::Namespace;
pub use sort::{SortDirection, SortField, SortSpec, SORT_KEY_FIELD};
pub use sort_key::{compare_values, SortKey};

/// A result document, as returned by a shard.
pub type Document = serde_json::Value;

/// Server-side cursor identifier. Zero means the cursor is exhausted on the
/// shard and no further getMore may be issued against it.
pub type CursorId = i64;
