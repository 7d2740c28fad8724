//! Caller operation context

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier for a caller operation
pub type OpId = u64;

static NEXT_OP_ID: AtomicU64 = AtomicU64::new(1);

/// The caller-scoped context a merger is attached to.
///
/// Remote commands carry the id of the context attached at scheduling time
/// so the executor can associate them with the originating operation. The
/// merger does not observe the context's deadline; the owning cursor calls
/// `kill()` on expiry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationContext {
    id: OpId,
}

impl OperationContext {
    /// Create a context with a fresh process-unique id
    pub fn new() -> Self {
        Self {
            id: NEXT_OP_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The operation id
    pub fn id(&self) -> OpId {
        self.id
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
