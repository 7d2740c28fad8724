//! One-shot events
//!
//! An [`EventHandle`] is the synchronization object a caller awaits when the
//! merger has nothing ready: created through the executor, signalled exactly
//! once, and edge-triggered - a wait that starts after the signal returns
//! immediately.

use std::sync::Arc;
use tokio::sync::watch;

/// Handle to a one-shot event.
///
/// Cloning yields another handle to the same event. Signalling is sticky and
/// idempotent at this level; the merger itself never signals an event twice.
#[derive(Debug, Clone)]
pub struct EventHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl EventHandle {
    /// Create a new, unsignalled event
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            signal: Arc::new(tx),
        }
    }

    /// Wake all current and future waiters
    pub fn signal(&self) {
        self.signal.send_replace(true);
    }

    /// Whether the event has been signalled
    pub fn is_signaled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Wait until the event is signalled; returns immediately if it already
    /// was
    pub async fn wait(&self) {
        let mut rx = self.signal.subscribe();
        // The sender lives in self, so wait_for cannot observe a closed
        // channel
        let _ = rx.wait_for(|signaled| *signaled).await;
    }
}

impl Default for EventHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EventHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

impl Eq for EventHandle {}
