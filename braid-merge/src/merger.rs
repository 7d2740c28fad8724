//! The async results merger
//!
//! One [`ResultsMerger`] exists per client cursor. A single internal mutex
//! serializes every caller operation and every executor callback; no method
//! blocks on I/O or holds the lock across a wait. Callers interact through
//! the synchronous `ready()`/`next_ready()` pair and await an
//! [`EventHandle`] from `next_event()` whenever nothing is buffered.

use crate::error::{MergeError, Result};
use crate::event::EventHandle;
use crate::executor::{CommandResponse, RemoteCommand, ResponseCallback, TaskExecutor};
use crate::merge_queue::MergeQueue;
use crate::opctx::OperationContext;
use crate::params::{MergerParams, TailableMode};
use crate::remote::RemoteCursor;
use braid_core::{Document, SortKey, SortSpec};
use braid_protocol::{CursorResponse, GetMoreRequest, KillCursorsRequest};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Teardown progress; advances monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Alive,
    KillStarted,
    KillComplete,
}

/// Merges the result streams of a set of established remote cursors into a
/// single stream, fetching follow-up batches on demand.
///
/// In sorted mode documents are emitted in non-decreasing sort-key order
/// across remotes; unsorted mode drains remotes in ring order. A merger
/// whose remotes are not exhausted must be shut down with [`kill`] before
/// being dropped, and the returned event awaited, so the remote cursors are
/// released.
///
/// [`kill`]: ResultsMerger::kill
pub struct ResultsMerger {
    inner: Arc<MergerInner>,
}

struct MergerInner {
    /// Identity handed to scheduled callbacks so they can re-enter the
    /// merger without keeping it alive
    self_ref: Weak<MergerInner>,
    executor: Arc<dyn TaskExecutor>,
    params: MergerParams,
    /// Precomputed read-preference metadata attached to every fetch
    metadata: Option<Document>,
    state: Mutex<MergerState>,
}

struct MergerState {
    remotes: Vec<RemoteCursor>,
    merge_queue: MergeQueue,
    lifecycle: Lifecycle,
    /// Ring pointer for unsorted selection
    getting_from: usize,
    /// The next `next_ready()` returns an end-of-batch marker
    eof_next: bool,
    /// First remote error observed by readiness evaluation
    status: std::result::Result<(), MergeError>,
    /// Outstanding caller event, if any; signalled exactly once
    current_event: Option<EventHandle>,
    /// Event returned by `kill()`, signalled once killCursors is scheduled
    kill_event: Option<EventHandle>,
    await_data_timeout: Option<Duration>,
    opctx: Option<OperationContext>,
}

impl ResultsMerger {
    /// Create a merger over a set of established remote cursors.
    ///
    /// Initial batches are buffered immediately; a document in a sorted
    /// stream that lacks its sort key latches an error on its remote, which
    /// the first `ready()`/`next_ready()` pair surfaces.
    ///
    /// Tailable modes are rejected with a sort, with
    /// `allow_partial_results`, or with more than one remote.
    pub fn new(
        opctx: OperationContext,
        executor: Arc<dyn TaskExecutor>,
        mut params: MergerParams,
    ) -> Result<ResultsMerger> {
        if params.tailable_mode.is_tailable() {
            if params.sort.is_some() {
                return Err(MergeError::BadValue(
                    "tailable cursors cannot use a sorted merge".to_string(),
                ));
            }
            if params.allow_partial_results {
                return Err(MergeError::BadValue(
                    "tailable cursors do not support partial results".to_string(),
                ));
            }
            if params.remotes.len() != 1 {
                return Err(MergeError::BadValue(
                    "tailable cursors are only valid against a single remote".to_string(),
                ));
            }
        }

        let metadata = params.read_preference.as_ref().map(|rp| rp.to_metadata());
        let handles = std::mem::take(&mut params.remotes);

        let mut state = MergerState {
            remotes: Vec::with_capacity(handles.len()),
            merge_queue: MergeQueue::new(),
            lifecycle: Lifecycle::Alive,
            getting_from: 0,
            eof_next: false,
            status: Ok(()),
            current_event: None,
            kill_event: None,
            await_data_timeout: None,
            opctx: Some(opctx),
        };
        for (remote_index, handle) in handles.into_iter().enumerate() {
            state
                .remotes
                .push(RemoteCursor::new(handle.host, handle.namespace, handle.cursor_id));
            // An invalid batch latches on the remote; the first ready()
            // surfaces it.
            state.add_batch_to_buffer(params.sort.as_ref(), remote_index, handle.initial_batch);
        }

        let inner = Arc::new_cyclic(|self_ref| MergerInner {
            self_ref: self_ref.clone(),
            executor,
            params,
            metadata,
            state: Mutex::new(state),
        });
        Ok(ResultsMerger { inner })
    }

    /// Whether `next_ready()` can currently produce a result, an
    /// end-of-batch marker, or an error without waiting
    pub fn ready(&self) -> bool {
        let mut state = self.inner.state.lock();
        self.inner.ready_locked(&mut state)
    }

    /// Produce the next merged document, or `None` at a batch boundary.
    ///
    /// Must only be called after `ready()` returned true. `None` means
    /// end-of-batch; it is end-of-stream only once `remotes_exhausted()`.
    pub fn next_ready(&self) -> Result<Option<Document>> {
        let mut state = self.inner.state.lock();
        self.inner.next_ready_locked(&mut state)
    }

    /// Schedule fetches for every remote that needs one and return an event
    /// that signals when `ready()` may have become true.
    ///
    /// On re-entry after a wait, remotes that still have a fetch in flight
    /// keep it, remotes with buffered documents need none, and exhausted
    /// remotes are skipped, so only remotes that genuinely need more data
    /// are scheduled.
    pub fn next_event(&self) -> Result<EventHandle> {
        let mut state = self.inner.state.lock();
        self.inner.next_event_locked(&mut state)
    }

    /// Begin teardown: cancel in-flight fetches, and once they drain,
    /// dispatch killCursors to every remote still holding a live cursor.
    ///
    /// Returns the event that signals when killCursors has been scheduled
    /// and the merger is safe to drop; repeated calls return the same
    /// event. `None` means the executor is shutting down and no event could
    /// be created - teardown completes degenerately and the shard-side
    /// cursor reaper handles any orphans.
    pub fn kill(&self, opctx: Option<&OperationContext>) -> Option<EventHandle> {
        let mut state = self.inner.state.lock();
        self.inner.kill_locked(&mut state, opctx)
    }

    /// Set the shard-side wait bound applied to subsequent fetches.
    ///
    /// Only valid for `TailableAndAwaitData` cursors.
    pub fn set_await_data_timeout(&self, timeout: Duration) -> Result<()> {
        let mut state = self.inner.state.lock();
        if self.inner.params.tailable_mode != TailableMode::TailableAndAwaitData {
            return Err(MergeError::BadValue(
                "await-data timeouts only apply to tailable, await-data cursors".to_string(),
            ));
        }
        state.await_data_timeout = Some(timeout);
        Ok(())
    }

    /// Detach from the caller's operation context while its execution is
    /// suspended.
    ///
    /// Also clears a pending end-of-batch marker: reattachment signals that
    /// the caller wants the tailable stream driven for a fresh batch rather
    /// than handed the stale boundary.
    pub fn detach_from_operation_context(&self) {
        let mut state = self.inner.state.lock();
        state.opctx = None;
        state.eof_next = false;
    }

    /// Attach a new operation context; the previous one must have been
    /// detached
    pub fn reattach_to_operation_context(&self, opctx: OperationContext) {
        let mut state = self.inner.state.lock();
        debug_assert!(state.opctx.is_none());
        state.opctx = Some(opctx);
    }

    /// Whether every remote cursor is closed on its shard
    pub fn remotes_exhausted(&self) -> bool {
        self.inner.state.lock().remotes_exhausted()
    }

    /// Number of remotes still holding a live shard-side cursor
    pub fn remaining_remotes(&self) -> usize {
        self.inner
            .state
            .lock()
            .remotes
            .iter()
            .filter(|r| !r.exhausted())
            .count()
    }
}

impl Drop for ResultsMerger {
    fn drop(&mut self) {
        let state = self.inner.state.lock();
        debug_assert!(
            state.remotes_exhausted() || state.lifecycle == Lifecycle::KillComplete,
            "results merger dropped with live remote cursors; kill() it and await the event"
        );
    }
}

impl MergerInner {
    fn ready_locked(&self, state: &mut MergerState) -> bool {
        if state.lifecycle != Lifecycle::Alive {
            return true;
        }
        if state.eof_next {
            return true;
        }

        let first_error = state
            .remotes
            .iter()
            .find_map(|r| r.status.as_ref().err().cloned());
        if let Some(error) = first_error {
            state.status = Err(error);
            return true;
        }

        match self.params.sort {
            Some(_) => self.ready_sorted(state),
            None => self.ready_unsorted(state),
        }
    }

    fn ready_sorted(&self, state: &MergerState) -> bool {
        // The next smallest key is only certain once every remote has a
        // head buffered or nothing left to contribute. Tailable cursors
        // cannot be sorted.
        debug_assert_eq!(self.params.tailable_mode, TailableMode::Normal);
        state.remotes.iter().all(|r| r.has_next() || r.exhausted())
    }

    fn ready_unsorted(&self, state: &MergerState) -> bool {
        let mut all_exhausted = true;
        for remote in &state.remotes {
            if !remote.exhausted() {
                all_exhausted = false;
            }
            if remote.has_next() {
                return true;
            }
        }
        all_exhausted
    }

    fn next_ready_locked(&self, state: &mut MergerState) -> Result<Option<Document>> {
        debug_assert!(self.ready_locked(state));
        if state.lifecycle != Lifecycle::Alive {
            return Err(MergeError::IllegalOperation(
                "next_ready() called on a killed results merger".to_string(),
            ));
        }

        if let Err(error) = &state.status {
            return Err(error.clone());
        }

        if state.eof_next {
            state.eof_next = false;
            return Ok(None);
        }

        if self.params.sort.is_some() {
            Ok(self.next_ready_sorted(state))
        } else {
            Ok(self.next_ready_unsorted(state))
        }
    }

    fn next_ready_sorted(&self, state: &mut MergerState) -> Option<Document> {
        let spec = self.params.sort.as_ref()?;

        let remote_index = state.merge_queue.pop()?;
        debug_assert!(state.remotes[remote_index].status.is_ok());
        let doc = state.remotes[remote_index].doc_buffer.pop_front()?;

        // Re-enter the queue under the fresh head key so the next
        // comparison sees it
        let next_key = state.remotes[remote_index]
            .doc_buffer
            .front()
            .map(|front| SortKey::extract(front, spec));
        match next_key {
            Some(Ok(key)) => state.merge_queue.push(key, remote_index),
            Some(Err(error)) => {
                state.remotes[remote_index].status =
                    Err(MergeError::Internal(error.to_string()));
            }
            None => {}
        }

        Some(doc)
    }

    fn next_ready_unsorted(&self, state: &mut MergerState) -> Option<Document> {
        let mut attempted = 0;
        while attempted < state.remotes.len() {
            let remote_index = state.getting_from;
            debug_assert!(state.remotes[remote_index].status.is_ok());

            if let Some(doc) = state.remotes[remote_index].doc_buffer.pop_front() {
                if self.params.tailable_mode == TailableMode::Tailable
                    && !state.remotes[remote_index].has_next()
                {
                    // Last buffered result of a tailable batch: the next
                    // call returns the boundary marker
                    state.eof_next = true;
                }
                return Some(doc);
            }

            attempted += 1;
            state.getting_from = (state.getting_from + 1) % state.remotes.len();
        }

        None
    }

    fn ask_for_next_batch(&self, state: &mut MergerState, remote_index: usize) -> Result<()> {
        debug_assert!(state.remotes[remote_index].callback.is_none());

        let remote = &state.remotes[remote_index];

        // When previous batches undershot the requested size, ask only for
        // the remainder so the aggregate cap per remote holds
        let mut batch_size = self.params.batch_size;
        if let Some(requested) = self.params.batch_size {
            if requested > remote.fetched_count {
                batch_size = Some(requested - remote.fetched_count);
            }
        }

        let mut request = GetMoreRequest::new(remote.cursor_ns.clone(), remote.cursor_id);
        if let Some(batch_size) = batch_size {
            request = request.with_batch_size(batch_size);
        }
        if self.params.tailable_mode == TailableMode::TailableAndAwaitData {
            if let Some(timeout) = state.await_data_timeout {
                request = request.with_max_time(timeout);
            }
        }

        tracing::debug!(host = %remote.host, cursor_id = remote.cursor_id, "scheduling getMore");

        let command = RemoteCommand {
            target: remote.host.clone(),
            database: self.params.namespace.database().to_string(),
            command: request.to_command(),
            metadata: self.metadata.clone(),
            op_id: state.opctx.as_ref().map(OperationContext::id),
        };

        let merger = self.self_ref.clone();
        let callback: ResponseCallback = Box::new(move |response| {
            if let Some(inner) = merger.upgrade() {
                let mut state = inner.state.lock();
                inner.handle_batch_response(&mut state, remote_index, response);
            }
        });

        let handle = self.executor.schedule_remote_command(command, callback)?;
        state.remotes[remote_index].callback = Some(handle);
        Ok(())
    }

    fn next_event_locked(&self, state: &mut MergerState) -> Result<EventHandle> {
        if state.lifecycle != Lifecycle::Alive {
            return Err(MergeError::IllegalOperation(
                "next_event() called on a killed results merger".to_string(),
            ));
        }
        if state.current_event.is_some() {
            // Every event must be signalled before another may be created
            return Err(MergeError::IllegalOperation(
                "next_event() called before the outstanding event was signalled".to_string(),
            ));
        }

        for remote_index in 0..state.remotes.len() {
            let remote = &state.remotes[remote_index];
            if let Err(error) = &remote.status {
                return Err(error.clone());
            }
            if !remote.has_next() && !remote.exhausted() && remote.callback.is_none() {
                self.ask_for_next_batch(state, remote_index)?;
            }
        }

        let event = self.executor.make_event()?;
        state.current_event = Some(event.clone());

        // A callback may have landed between the caller's ready()
        // observation and event creation; carry that readiness over to the
        // fresh event
        self.signal_current_event_if_ready(state);
        Ok(event)
    }

    fn handle_batch_response(
        &self,
        state: &mut MergerState,
        remote_index: usize,
        response: CommandResponse,
    ) {
        state.remotes[remote_index].callback = None;

        if state.lifecycle != Lifecycle::Alive {
            // Wake any waiter before teardown bookkeeping; the owner may
            // drop the merger as soon as the kill event signals
            self.signal_current_event_if_ready(state);
            self.clean_up_killed_batch(state);
            return;
        }

        self.process_batch_results(state, remote_index, response);
        self.signal_current_event_if_ready(state);
    }

    fn process_batch_results(
        &self,
        state: &mut MergerState,
        remote_index: usize,
        response: CommandResponse,
    ) {
        let payload = match response {
            Ok(payload) => payload,
            Err(error) => {
                return self.clean_up_failed_batch(state, remote_index, error);
            }
        };

        let cursor_response = match CursorResponse::parse(&payload) {
            Ok(cursor_response) => cursor_response,
            Err(error) => {
                return self.clean_up_failed_batch(state, remote_index, error.into());
            }
        };

        // A non-zero id must match the established cursor; zero means the
        // shard has exhausted it
        let established = state.remotes[remote_index].cursor_id;
        if cursor_response.cursor_id != 0 && cursor_response.cursor_id != established {
            let error = MergeError::BadValue(format!(
                "expected cursor id {established} but received {}",
                cursor_response.cursor_id
            ));
            return self.clean_up_failed_batch(state, remote_index, error);
        }

        state.remotes[remote_index].cursor_id = cursor_response.cursor_id;
        if !state.add_batch_to_buffer(self.params.sort.as_ref(), remote_index, cursor_response.batch)
        {
            return;
        }

        let (has_next, exhausted) = {
            let remote = &state.remotes[remote_index];
            (remote.has_next(), remote.exhausted())
        };
        if self.params.tailable_mode == TailableMode::Tailable && !has_next {
            // An empty tailable batch is forwarded to the caller as a batch
            // boundary; the caller re-polls to keep tailing. Tailable
            // cursors exist on a single remote only.
            debug_assert_eq!(state.remotes.len(), 1);
            state.eof_next = true;
        } else if !has_next && !exhausted {
            // Nothing buffered even after this batch: go straight back out
            if let Err(error) = self.ask_for_next_batch(state, remote_index) {
                state.remotes[remote_index].status = Err(error);
            }
        }
    }

    fn clean_up_failed_batch(
        &self,
        state: &mut MergerState,
        remote_index: usize,
        error: MergeError,
    ) {
        let remote = &mut state.remotes[remote_index];
        if self.params.allow_partial_results {
            // The failed host drops out of the merge entirely: no further
            // fetches, excluded from kill
            tracing::debug!(host = %remote.host, error = %error,
                "absorbing remote failure under allow_partial_results");
            remote.status = Ok(());
            remote.doc_buffer.clear();
            remote.cursor_id = 0;
        } else {
            tracing::warn!(host = %remote.host, error = %error, "remote batch failed");
            remote.status = Err(error);
        }
    }

    fn clean_up_killed_batch(&self, state: &mut MergerState) {
        debug_assert_eq!(state.lifecycle, Lifecycle::KillStarted);

        // Once the final outstanding response has drained, the remote
        // cursors can be torn down and the owner may destroy the merger
        if !state.have_outstanding_requests() {
            if let Some(event) = state.kill_event.clone() {
                let opctx = state.opctx.clone();
                self.schedule_kill_cursors(state, opctx.as_ref());
                self.executor.signal_event(&event);
            }
            state.lifecycle = Lifecycle::KillComplete;
        }
    }

    fn schedule_kill_cursors(&self, state: &MergerState, opctx: Option<&OperationContext>) {
        debug_assert_eq!(state.lifecycle, Lifecycle::KillStarted);
        debug_assert!(state.kill_event.is_some());

        for remote in &state.remotes {
            debug_assert!(remote.callback.is_none());

            if remote.status.is_ok() && !remote.exhausted() {
                tracing::debug!(host = %remote.host, cursor_id = remote.cursor_id,
                    "scheduling killCursors");
                let request =
                    KillCursorsRequest::new(self.params.namespace.clone(), vec![remote.cursor_id]);
                let command = RemoteCommand {
                    target: remote.host.clone(),
                    database: self.params.namespace.database().to_string(),
                    command: request.to_command(),
                    metadata: None,
                    op_id: opctx.map(OperationContext::id),
                };
                // Fire and forget: a failed submission leaves the cursor to
                // the shard-side reaper
                let _ = self
                    .executor
                    .schedule_remote_command(command, Box::new(|_| {}));
            }
        }
    }

    fn kill_locked(
        &self,
        state: &mut MergerState,
        opctx: Option<&OperationContext>,
    ) -> Option<EventHandle> {
        if let Some(event) = &state.kill_event {
            debug_assert!(state.lifecycle != Lifecycle::Alive);
            return Some(event.clone());
        }

        tracing::debug!("killing results merger");
        state.lifecycle = Lifecycle::KillStarted;

        let event = match self.executor.make_event() {
            Ok(event) => event,
            Err(_) => {
                // Executor shutdown: nothing further can be scheduled, so
                // teardown completes degenerately
                if !state.have_outstanding_requests() {
                    state.lifecycle = Lifecycle::KillComplete;
                }
                return None;
            }
        };
        state.kill_event = Some(event.clone());

        if !state.have_outstanding_requests() {
            // No responses to wait for; tear down the remote cursors now
            self.schedule_kill_cursors(state, opctx);
            state.lifecycle = Lifecycle::KillComplete;
            self.executor.signal_event(&event);
        } else {
            // Outstanding fetches must drain first. Their cancellation
            // responses route through handle_batch_response, and the last
            // one performs the teardown
            for remote in &state.remotes {
                if let Some(handle) = &remote.callback {
                    self.executor.cancel(handle);
                }
            }
        }

        Some(event)
    }

    fn signal_current_event_if_ready(&self, state: &mut MergerState) {
        if self.ready_locked(state) {
            if let Some(event) = state.current_event.take() {
                self.executor.signal_event(&event);
            }
        }
    }
}

impl MergerState {
    /// Append a batch to a remote's buffer, validating sort keys and
    /// entering the remote into the merge queue when sorted.
    ///
    /// Returns false after latching an error on the remote.
    fn add_batch_to_buffer(
        &mut self,
        sort: Option<&SortSpec>,
        remote_index: usize,
        batch: Vec<Document>,
    ) -> bool {
        let mut head_key = None;
        {
            let remote = &mut self.remotes[remote_index];
            for doc in batch {
                if let Some(spec) = sort {
                    match SortKey::extract(&doc, spec) {
                        Ok(key) => {
                            if head_key.is_none() && remote.doc_buffer.is_empty() {
                                head_key = Some(key);
                            }
                        }
                        Err(error) => {
                            remote.status = Err(MergeError::Internal(error.to_string()));
                            return false;
                        }
                    }
                }
                remote.doc_buffer.push_back(doc);
                remote.fetched_count += 1;
            }
        }

        // One push covers the whole batch: the queue keys on the buffer
        // head, and the remote was outside the queue while its buffer was
        // empty
        if let Some(key) = head_key {
            self.merge_queue.push(key, remote_index);
        }
        true
    }

    fn remotes_exhausted(&self) -> bool {
        self.remotes.iter().all(|r| r.exhausted())
    }

    fn have_outstanding_requests(&self) -> bool {
        self.remotes.iter().any(|r| r.callback.is_some())
    }
}
