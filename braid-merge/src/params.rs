//! Merger construction parameters

use braid_core::{CursorId, Document, Namespace, ShardHost, SortSpec};
use braid_protocol::ReadPreference;

/// Tailable behavior of the underlying cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailableMode {
    /// Finite stream; exhaustion is final
    #[default]
    Normal,
    /// Tailable cursor: empty batches mark batch boundaries, never
    /// end-of-stream
    Tailable,
    /// Tailable cursor where the shard blocks up to the await-data timeout
    /// for new results
    TailableAndAwaitData,
}

impl TailableMode {
    /// Whether this is one of the tailable modes
    pub fn is_tailable(&self) -> bool {
        !matches!(self, TailableMode::Normal)
    }
}

/// An already-established remote cursor handed to the merger at
/// construction, together with the documents its establishing command
/// returned.
#[derive(Debug, Clone)]
pub struct RemoteCursorHandle {
    /// Shard endpoint the cursor lives on
    pub host: ShardHost,
    /// Namespace the cursor is scoped to on that shard
    pub namespace: Namespace,
    /// Established cursor id; zero if the initial batch was final
    pub cursor_id: CursorId,
    /// Documents returned by the establishing command
    pub initial_batch: Vec<Document>,
}

impl RemoteCursorHandle {
    /// Describe an established remote cursor with an empty initial batch
    pub fn new(host: impl Into<ShardHost>, namespace: Namespace, cursor_id: CursorId) -> Self {
        Self {
            host: host.into(),
            namespace,
            cursor_id,
            initial_batch: Vec::new(),
        }
    }

    /// Attach the initial batch
    pub fn with_initial_batch(mut self, batch: Vec<Document>) -> Self {
        self.initial_batch = batch;
        self
    }
}

/// Immutable configuration of a [`ResultsMerger`](crate::ResultsMerger).
#[derive(Debug, Clone)]
pub struct MergerParams {
    /// The namespace the client query targeted
    pub namespace: Namespace,
    /// Requested cross-shard ordering; `None` for an unsorted stream
    pub sort: Option<SortSpec>,
    /// Caller-requested batch size, applied as an aggregate cap per remote
    pub batch_size: Option<u64>,
    /// Tailable behavior
    pub tailable_mode: TailableMode,
    /// Convert remote failures into silent exhaustion
    pub allow_partial_results: bool,
    /// Read preference attached to every fetch
    pub read_preference: Option<ReadPreference>,
    /// The established remote cursors to merge
    pub remotes: Vec<RemoteCursorHandle>,
}

impl MergerParams {
    /// Create params for an unsorted, non-tailable stream with no remotes
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            sort: None,
            batch_size: None,
            tailable_mode: TailableMode::Normal,
            allow_partial_results: false,
            read_preference: None,
            remotes: Vec::new(),
        }
    }

    /// Set the sort specification
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the tailable mode
    pub fn with_tailable_mode(mut self, mode: TailableMode) -> Self {
        self.tailable_mode = mode;
        self
    }

    /// Allow the stream to continue past individual remote failures
    pub fn with_allow_partial_results(mut self, allow: bool) -> Self {
        self.allow_partial_results = allow;
        self
    }

    /// Set the read preference
    pub fn with_read_preference(mut self, read_preference: ReadPreference) -> Self {
        self.read_preference = Some(read_preference);
        self
    }

    /// Add an established remote cursor
    pub fn add_remote(mut self, remote: RemoteCursorHandle) -> Self {
        self.remotes.push(remote);
        self
    }
}
