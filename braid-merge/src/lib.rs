//! # Braid Merge
//!
//! The async results merger: the engine a query router uses to drive a set
//! of already-established remote cursors on shards and present one unified
//! result stream.
//!
//! This crate provides:
//! - [`ResultsMerger`] - the per-cursor state machine: buffered remote
//!   cursors, k-way sorted merge, event-driven follow-up fetches, and the
//!   kill protocol that guarantees remote cursors are torn down
//! - [`TaskExecutor`] - the interface to the callback-scheduling runtime
//!   the merger submits remote commands to
//! - [`EventHandle`] - the one-shot event a caller awaits when no document
//!   is ready yet
//!
//! ## Calling convention
//!
//! All merger methods are synchronous and non-blocking. A caller alternates
//! [`ResultsMerger::ready`] / [`ResultsMerger::next_ready`] with
//! [`ResultsMerger::next_event`], awaiting the returned event whenever no
//! result is currently available:
//!
//! ```ignore
//! loop {
//!     if merger.ready() {
//!         match merger.next_ready()? {
//!             Some(doc) => emit(doc),
//!             // End of batch; end of stream once remotes_exhausted().
//!             // Tailable callers re-poll here instead.
//!             None => break,
//!         }
//!     } else {
//!         merger.next_event()?.wait().await;
//!     }
//! }
//! ```
//!
//! Before dropping a merger whose remotes are not exhausted, call
//! [`ResultsMerger::kill`] and await the returned event; this drains
//! in-flight fetches and dispatches killCursors to every live remote.

pub mod error;
pub mod event;
pub mod executor;
pub mod merger;
pub mod opctx;
pub mod params;

mod merge_queue;
mod remote;

#[cfg(test)]
pub mod test_utils;

pub use error::{MergeError, Result};
pub use event::EventHandle;
pub use executor::{CallbackHandle, CommandResponse, RemoteCommand, ResponseCallback, TaskExecutor};
pub use merger::ResultsMerger;
pub use opctx::{OpId, OperationContext};
pub use params::{MergerParams, RemoteCursorHandle, TailableMode};
