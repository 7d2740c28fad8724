//! Cursor response parsing

use crate::error::{ProtocolError, Result};
use braid_core::{CursorId, Document, Namespace};
use serde_json::Value;

/// One batch of results from a shard cursor.
///
/// The envelope is shared by initial reads (`firstBatch`) and follow-up
/// fetches (`nextBatch`):
///
/// ```json
/// {"cursor": {"id": 42, "ns": "db.coll", "nextBatch": [...]}, "ok": 1}
/// ```
///
/// A zero `id` means the shard has exhausted the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorResponse {
    /// Cursor id for subsequent fetches; zero when exhausted
    pub cursor_id: CursorId,
    /// Namespace the cursor is scoped to
    pub namespace: Namespace,
    /// The documents of this batch, in shard order
    pub batch: Vec<Document>,
}

impl CursorResponse {
    /// Parse a response payload.
    ///
    /// An `ok: 0` payload surfaces the shard's `errmsg` as
    /// [`ProtocolError::CommandFailed`]; structural problems surface as
    /// [`ProtocolError::MalformedResponse`].
    pub fn parse(payload: &Value) -> Result<CursorResponse> {
        let ok = payload
            .get("ok")
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed("missing 'ok' field"))?;
        if ok != 1.0 {
            let message = payload
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("(no errmsg)");
            return Err(ProtocolError::CommandFailed(message.to_string()));
        }

        let cursor = payload
            .get("cursor")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing 'cursor' document"))?;

        let cursor_id = cursor
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("missing numeric 'cursor.id'"))?;

        let namespace = cursor
            .get("ns")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing 'cursor.ns'"))
            .and_then(|ns| {
                Namespace::parse(ns).map_err(|e| malformed(&format!("bad 'cursor.ns': {e}")))
            })?;

        let batch = cursor
            .get("nextBatch")
            .or_else(|| cursor.get("firstBatch"))
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing 'firstBatch' or 'nextBatch' array"))?
            .clone();

        Ok(CursorResponse {
            cursor_id,
            namespace,
            batch,
        })
    }
}

fn malformed(detail: &str) -> ProtocolError {
    ProtocolError::MalformedResponse(detail.to_string())
}
