//! Shared test support: a deterministic, manually-pumped mock executor and
//! response builders.

use crate::error::{MergeError, Result};
use crate::event::EventHandle;
use crate::executor::{
    CallbackHandle, CommandResponse, RemoteCommand, ResponseCallback, TaskExecutor,
};
use braid_core::{CursorId, Document, ShardHost};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Records scheduled commands and fires their callbacks only when a test
/// pumps it, so every interleaving is explicit.
pub struct MockExecutor {
    scheduled: Mutex<Vec<Scheduled>>,
    next_id: AtomicU64,
    shutdown: AtomicBool,
}

struct Scheduled {
    handle: CallbackHandle,
    command: RemoteCommand,
    callback: ResponseCallback,
    canceled: bool,
}

impl MockExecutor {
    pub fn new() -> Arc<MockExecutor> {
        Arc::new(MockExecutor {
            scheduled: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Make every further schedule/make_event call fail with
    /// `ShutdownInProgress`
    pub fn shut_down(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Commands awaiting a response, oldest first
    pub fn pending_commands(&self) -> Vec<RemoteCommand> {
        self.scheduled.lock().iter().map(|s| s.command.clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.scheduled.lock().len()
    }

    /// Complete the oldest pending command with `response`
    pub fn respond_next(&self, response: CommandResponse) {
        let entry = {
            let mut scheduled = self.scheduled.lock();
            assert!(!scheduled.is_empty(), "no pending commands");
            scheduled.remove(0)
        };
        (entry.callback)(response);
    }

    /// Complete the oldest pending command addressed at `host`
    pub fn respond_to_host(&self, host: &ShardHost, response: CommandResponse) {
        let entry = {
            let mut scheduled = self.scheduled.lock();
            let position = scheduled
                .iter()
                .position(|s| s.command.target == *host)
                .unwrap_or_else(|| panic!("no pending command for {host}"));
            scheduled.remove(position)
        };
        (entry.callback)(response);
    }

    /// Fire the callback of every canceled command with
    /// [`MergeError::Canceled`]
    pub fn deliver_cancellations(&self) {
        let canceled: Vec<Scheduled> = {
            let mut scheduled = self.scheduled.lock();
            let (canceled, keep): (Vec<_>, Vec<_>) =
                scheduled.drain(..).partition(|s| s.canceled);
            *scheduled = keep;
            canceled
        };
        for entry in canceled {
            (entry.callback)(Err(MergeError::Canceled));
        }
    }
}

impl TaskExecutor for MockExecutor {
    fn schedule_remote_command(
        &self,
        command: RemoteCommand,
        callback: ResponseCallback,
    ) -> Result<CallbackHandle> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(MergeError::ShutdownInProgress);
        }
        let handle = CallbackHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().push(Scheduled {
            handle: handle.clone(),
            command,
            callback,
            canceled: false,
        });
        Ok(handle)
    }

    fn make_event(&self) -> Result<EventHandle> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(MergeError::ShutdownInProgress);
        }
        Ok(EventHandle::new())
    }

    fn signal_event(&self, event: &EventHandle) {
        event.signal();
    }

    fn cancel(&self, handle: &CallbackHandle) {
        let mut scheduled = self.scheduled.lock();
        if let Some(entry) = scheduled.iter_mut().find(|s| s.handle == *handle) {
            entry.canceled = true;
        }
    }
}

/// Build a cursor response payload as a shard would return it
pub fn cursor_response(ns: &str, cursor_id: CursorId, batch: Vec<Document>) -> Document {
    json!({"cursor": {"id": cursor_id, "ns": ns, "nextBatch": batch}, "ok": 1})
}

/// A document carrying a single-element integer sort key
pub fn keyed_doc(id: i64, key: i64) -> Document {
    json!({"_id": id, "$sortKey": [key]})
}
