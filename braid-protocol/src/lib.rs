//! Wire protocol types for the braid results merger.
//!
//! This crate defines the command documents the merger emits and the
//! response envelope it consumes:
//!
//! - [`GetMoreRequest`] / [`KillCursorsRequest`] encode follow-up fetch and
//!   cursor teardown commands
//! - [`CursorResponse`] parses the batch envelope a shard returns
//! - [`ReadPreference`] encodes the routing metadata attached to fetches
//!
//! Commands and responses are plain JSON documents; transport and targeting
//! belong to the task executor, not this crate.

mod error;
mod read_preference;
mod request;
mod response;

pub use error::{ProtocolError, Result};
pub use read_preference::ReadPreference;
pub use request::{GetMoreRequest, KillCursorsRequest};
pub use response::CursorResponse;
