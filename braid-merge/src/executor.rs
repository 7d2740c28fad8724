//! Task executor interface
//!
//! The merger never performs I/O itself: it submits remote commands to a
//! [`TaskExecutor`] and is re-entered by the executor's completion
//! callbacks. The executor runtime (threading, transport, timers) is
//! entirely external; this module only fixes the contract the merger relies
//! on.

use crate::error::{MergeError, Result};
use crate::event::EventHandle;
use crate::opctx::OpId;
use braid_core::{Document, ShardHost};

/// Executor-level outcome of a remote command: the raw response payload on
/// success, or a transport/cancellation error.
pub type CommandResponse = std::result::Result<Document, MergeError>;

/// Completion callback for a scheduled remote command. Invoked exactly once
/// unless submission itself failed.
pub type ResponseCallback = Box<dyn FnOnce(CommandResponse) + Send + 'static>;

/// A command ready for submission to a shard.
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    /// Shard endpoint to direct the command at
    pub target: ShardHost,
    /// Database the command executes against
    pub database: String,
    /// The command document
    pub command: Document,
    /// Request metadata (read preference), if configured
    pub metadata: Option<Document>,
    /// Id of the caller operation attached at scheduling time
    pub op_id: Option<OpId>,
}

/// Identifier of an in-flight scheduled command, usable for cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u64);

impl CallbackHandle {
    /// Wrap an executor-assigned id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The executor-assigned id
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The callback-scheduling runtime the merger submits work to.
///
/// Implementations must invoke callbacks from outside any merger method:
/// the merger re-locks its own state when a callback fires, so running a
/// callback synchronously inside [`TaskExecutor::cancel`] or
/// [`TaskExecutor::schedule_remote_command`] would deadlock.
pub trait TaskExecutor: Send + Sync {
    /// Submit a command. On success the returned handle identifies the
    /// in-flight call and the callback will fire exactly once - with the
    /// response, a transport error, or [`MergeError::Canceled`]. If
    /// submission fails the callback is never invoked.
    fn schedule_remote_command(
        &self,
        command: RemoteCommand,
        callback: ResponseCallback,
    ) -> Result<CallbackHandle>;

    /// Create a one-shot event. Fails only while the executor is shutting
    /// down.
    fn make_event(&self) -> Result<EventHandle>;

    /// Signal an event created by this executor
    fn signal_event(&self, event: &EventHandle);

    /// Request cancellation of an in-flight command. The callback still
    /// fires, with [`MergeError::Canceled`].
    fn cancel(&self, handle: &CallbackHandle);
}
