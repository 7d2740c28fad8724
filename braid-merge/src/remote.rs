//! Per-shard buffered cursor state

use crate::error::MergeError;
use crate::executor::CallbackHandle;
use braid_core::{CursorId, Document, Namespace, ShardHost};
use std::collections::VecDeque;

/// Buffered state of one remote cursor.
///
/// All fields are guarded by the merger's mutex.
#[derive(Debug)]
pub(crate) struct RemoteCursor {
    /// Shard-side cursor id; zero once the shard reports exhaustion
    pub cursor_id: CursorId,
    /// Namespace the cursor is scoped to on its shard
    pub cursor_ns: Namespace,
    /// Endpoint getMore and killCursors are directed at
    pub host: ShardHost,
    /// Locally buffered documents, in shard order
    pub doc_buffer: VecDeque<Document>,
    /// Total documents ever received from this remote
    pub fetched_count: u64,
    /// Last error from this remote; latched until surfaced or absorbed
    pub status: Result<(), MergeError>,
    /// Handle of the in-flight fetch, if one is outstanding
    pub callback: Option<CallbackHandle>,
}

impl RemoteCursor {
    pub fn new(host: ShardHost, cursor_ns: Namespace, cursor_id: CursorId) -> Self {
        Self {
            cursor_id,
            cursor_ns,
            host,
            doc_buffer: VecDeque::new(),
            fetched_count: 0,
            status: Ok(()),
            callback: None,
        }
    }

    /// Whether a document is buffered locally
    pub fn has_next(&self) -> bool {
        !self.doc_buffer.is_empty()
    }

    /// Whether the shard-side cursor is closed; no further getMore is ever
    /// issued once this holds
    pub fn exhausted(&self) -> bool {
        self.cursor_id == 0
    }
}
