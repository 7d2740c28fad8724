//! Outbound command encoding

use braid_core::{CursorId, Document, Namespace};
use serde_json::json;
use std::time::Duration;

/// A follow-up batch fetch against an established remote cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMoreRequest {
    /// Namespace the cursor was opened against
    pub namespace: Namespace,
    /// Established cursor id on the shard
    pub cursor_id: CursorId,
    /// Maximum number of documents to return in this batch
    pub batch_size: Option<u64>,
    /// Server-side wait bound for await-data cursors
    pub max_time: Option<Duration>,
}

impl GetMoreRequest {
    /// Create a getMore with neither batch size nor time bound
    pub fn new(namespace: Namespace, cursor_id: CursorId) -> Self {
        Self {
            namespace,
            cursor_id,
            batch_size: None,
            max_time: None,
        }
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the await-data time bound
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Encode as the command document sent to the shard
    pub fn to_command(&self) -> Document {
        let mut cmd = serde_json::Map::new();
        cmd.insert("getMore".to_string(), json!(self.cursor_id));
        cmd.insert(
            "collection".to_string(),
            json!(self.namespace.collection()),
        );
        if let Some(batch_size) = self.batch_size {
            cmd.insert("batchSize".to_string(), json!(batch_size));
        }
        if let Some(max_time) = self.max_time {
            cmd.insert("maxTimeMS".to_string(), json!(max_time.as_millis() as u64));
        }
        Document::Object(cmd)
    }
}

/// Teardown of one or more remote cursors on a shard.
///
/// Dispatched fire-and-forget: the merger never waits for, or acts on, the
/// response.
#[derive(Debug, Clone, PartialEq)]
pub struct KillCursorsRequest {
    /// Namespace the cursors were opened against
    pub namespace: Namespace,
    /// Cursor ids to close
    pub cursor_ids: Vec<CursorId>,
}

impl KillCursorsRequest {
    /// Create a killCursors request
    pub fn new(namespace: Namespace, cursor_ids: Vec<CursorId>) -> Self {
        Self {
            namespace,
            cursor_ids,
        }
    }

    /// Encode as the command document sent to the shard
    pub fn to_command(&self) -> Document {
        json!({
            "killCursors": self.namespace.collection(),
            "cursors": self.cursor_ids,
        })
    }
}
