//! Merge two scripted shard cursors into one sorted stream (example)
//!
//! Wires a minimal channel-backed executor to a pair of in-process "shards"
//! and drains the merged stream, printing each document.
//!
//! Run with: `cargo run -p braid-merge --example merge_two_shards`

use braid_core::{Namespace, SortSpec};
use braid_merge::{
    CallbackHandle, EventHandle, MergeError, MergerParams, OperationContext, RemoteCommand,
    RemoteCursorHandle, ResponseCallback, ResultsMerger, TaskExecutor,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

struct ChannelExecutor {
    tx: mpsc::UnboundedSender<(RemoteCommand, ResponseCallback)>,
    next_id: AtomicU64,
}

impl TaskExecutor for ChannelExecutor {
    fn schedule_remote_command(
        &self,
        command: RemoteCommand,
        callback: ResponseCallback,
    ) -> braid_merge::Result<CallbackHandle> {
        self.tx
            .send((command, callback))
            .map_err(|_| MergeError::ShutdownInProgress)?;
        Ok(CallbackHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn make_event(&self) -> braid_merge::Result<EventHandle> {
        Ok(EventHandle::new())
    }

    fn signal_event(&self, event: &EventHandle) {
        event.signal();
    }

    fn cancel(&self, _handle: &CallbackHandle) {}
}

fn keyed(id: i64, key: i64) -> Value {
    json!({"_id": id, "$sortKey": [key]})
}

fn response(cursor_id: i64, batch: Vec<Value>) -> Value {
    json!({"cursor": {"id": cursor_id, "ns": "demo.events", "nextBatch": batch}, "ok": 1})
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .init();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let executor = Arc::new(ChannelExecutor {
        tx,
        next_id: AtomicU64::new(1),
    });

    // Each shard answers its getMores from a canned script
    let mut scripts: HashMap<String, VecDeque<Value>> = HashMap::new();
    scripts.insert(
        "shard0:27017".to_string(),
        VecDeque::from(vec![response(0, vec![keyed(103, 5), keyed(104, 7)])]),
    );
    scripts.insert(
        "shard1:27017".to_string(),
        VecDeque::from(vec![response(0, vec![keyed(203, 6)])]),
    );
    tokio::spawn(async move {
        while let Some((command, callback)) = rx.recv().await {
            let response = scripts
                .get_mut(command.target.as_str())
                .and_then(|responses| responses.pop_front())
                .expect("unscripted command");
            callback(Ok(response));
        }
    });

    let ns = Namespace::new("demo", "events");
    let params = MergerParams::new(ns.clone())
        .with_sort(SortSpec::new().asc("ts"))
        .add_remote(
            RemoteCursorHandle::new("shard0:27017", ns.clone(), 11)
                .with_initial_batch(vec![keyed(101, 1), keyed(102, 4)]),
        )
        .add_remote(
            RemoteCursorHandle::new("shard1:27017", ns, 22)
                .with_initial_batch(vec![keyed(201, 2), keyed(202, 3)]),
        );
    let merger = ResultsMerger::new(OperationContext::new(), executor, params)?;

    loop {
        if merger.ready() {
            match merger.next_ready()? {
                Some(doc) => println!("{doc}"),
                None => break,
            }
        } else {
            merger.next_event()?.wait().await;
        }
    }

    tracing::info!(exhausted = merger.remotes_exhausted(), "stream drained");
    Ok(())
}
