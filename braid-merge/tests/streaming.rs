//! End-to-end merge flows driven through an asynchronous executor.
//!
//! Commands are shipped to a scripted shard task over a channel and
//! callbacks fire from that task, so the caller genuinely waits on merger
//! events instead of a manually pumped mock.

use braid_core::{Namespace, SortSpec};
use braid_merge::{
    CallbackHandle, EventHandle, MergeError, MergerParams, OperationContext, RemoteCommand,
    RemoteCursorHandle, ResponseCallback, ResultsMerger, TaskExecutor,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

enum Submission {
    Command {
        handle: u64,
        command: RemoteCommand,
        callback: ResponseCallback,
    },
    Cancel {
        handle: u64,
    },
}

/// Ships scheduled commands to a shard task; callbacks are invoked over
/// there, never inside the scheduling call.
struct ChannelExecutor {
    tx: mpsc::UnboundedSender<Submission>,
    next_id: AtomicU64,
}

impl ChannelExecutor {
    fn new() -> (Arc<ChannelExecutor>, mpsc::UnboundedReceiver<Submission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(ChannelExecutor {
                tx,
                next_id: AtomicU64::new(1),
            }),
            rx,
        )
    }
}

impl TaskExecutor for ChannelExecutor {
    fn schedule_remote_command(
        &self,
        command: RemoteCommand,
        callback: ResponseCallback,
    ) -> braid_merge::Result<CallbackHandle> {
        let handle = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tx
            .send(Submission::Command {
                handle,
                command,
                callback,
            })
            .map_err(|_| MergeError::ShutdownInProgress)?;
        Ok(CallbackHandle::new(handle))
    }

    fn make_event(&self) -> braid_merge::Result<EventHandle> {
        Ok(EventHandle::new())
    }

    fn signal_event(&self, event: &EventHandle) {
        event.signal();
    }

    fn cancel(&self, handle: &CallbackHandle) {
        let _ = self.tx.send(Submission::Cancel {
            handle: handle.id(),
        });
    }
}

fn ns() -> Namespace {
    Namespace::new("db", "coll")
}

fn keyed(id: i64, key: i64) -> Value {
    json!({"_id": id, "$sortKey": [key]})
}

fn response(cursor_id: i64, batch: Vec<Value>) -> Value {
    json!({"cursor": {"id": cursor_id, "ns": "db.coll", "nextBatch": batch}, "ok": 1})
}

/// Serve each getMore from a per-host script of canned responses
fn spawn_scripted_shards(
    mut rx: mpsc::UnboundedReceiver<Submission>,
    scripts: HashMap<&'static str, VecDeque<Value>>,
) {
    let mut scripts: HashMap<String, VecDeque<Value>> = scripts
        .into_iter()
        .map(|(host, responses)| (host.to_string(), responses))
        .collect();
    tokio::spawn(async move {
        while let Some(submission) = rx.recv().await {
            match submission {
                Submission::Command {
                    command, callback, ..
                } => {
                    let response = scripts
                        .get_mut(command.target.as_str())
                        .and_then(|responses| responses.pop_front())
                        .expect("unscripted command");
                    callback(Ok(response));
                }
                Submission::Cancel { .. } => {}
            }
        }
    });
}

#[tokio::test]
async fn sorted_merge_end_to_end() {
    let (executor, rx) = ChannelExecutor::new();

    let mut scripts: HashMap<&'static str, VecDeque<Value>> = HashMap::new();
    scripts.insert(
        "shard0:27017",
        VecDeque::from(vec![
            response(11, vec![keyed(103, 5), keyed(104, 8)]),
            response(0, vec![keyed(105, 9)]),
        ]),
    );
    scripts.insert(
        "shard1:27017",
        VecDeque::from(vec![response(0, vec![keyed(203, 6), keyed(204, 7)])]),
    );
    spawn_scripted_shards(rx, scripts);

    let params = MergerParams::new(ns())
        .with_sort(SortSpec::new().asc("a"))
        .add_remote(
            RemoteCursorHandle::new("shard0:27017", ns(), 11)
                .with_initial_batch(vec![keyed(101, 1), keyed(102, 4)]),
        )
        .add_remote(
            RemoteCursorHandle::new("shard1:27017", ns(), 22)
                .with_initial_batch(vec![keyed(201, 2), keyed(202, 3)]),
        );
    let merger = ResultsMerger::new(OperationContext::new(), executor, params).unwrap();

    let mut keys = Vec::new();
    loop {
        if merger.ready() {
            match merger.next_ready().unwrap() {
                Some(doc) => keys.push(doc["$sortKey"][0].as_i64().unwrap()),
                None => break,
            }
        } else {
            merger.next_event().unwrap().wait().await;
        }
    }

    assert_eq!(keys, (1..=9).collect::<Vec<_>>());
    assert!(merger.remotes_exhausted());
}

#[tokio::test]
async fn unsorted_stream_rides_through_empty_batches() {
    let (executor, rx) = ChannelExecutor::new();

    let mut scripts: HashMap<&'static str, VecDeque<Value>> = HashMap::new();
    scripts.insert(
        "shard0:27017",
        VecDeque::from(vec![
            response(11, vec![]),
            response(11, vec![json!({"x": 2}), json!({"x": 3})]),
            response(0, vec![]),
        ]),
    );
    spawn_scripted_shards(rx, scripts);

    let params = MergerParams::new(ns()).add_remote(
        RemoteCursorHandle::new("shard0:27017", ns(), 11)
            .with_initial_batch(vec![json!({"x": 1})]),
    );
    let merger = ResultsMerger::new(OperationContext::new(), executor, params).unwrap();

    let mut seen = Vec::new();
    loop {
        if merger.ready() {
            match merger.next_ready().unwrap() {
                Some(doc) => seen.push(doc["x"].as_i64().unwrap()),
                None => break,
            }
        } else {
            merger.next_event().unwrap().wait().await;
        }
    }

    assert_eq!(seen, vec![1, 2, 3]);
    assert!(merger.remotes_exhausted());
}

#[tokio::test]
async fn kill_tears_down_remote_cursors() {
    let (executor, mut rx) = ChannelExecutor::new();

    let kills: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = kills.clone();
    tokio::spawn(async move {
        // getMores are held unanswered until their cancellation arrives;
        // killCursors is acknowledged and recorded
        let mut held: HashMap<u64, ResponseCallback> = HashMap::new();
        while let Some(submission) = rx.recv().await {
            match submission {
                Submission::Command {
                    handle,
                    command,
                    callback,
                } => {
                    if command.command.get("killCursors").is_some() {
                        recorded.lock().unwrap().push(command.command.clone());
                        callback(Ok(json!({"ok": 1})));
                    } else {
                        held.insert(handle, callback);
                    }
                }
                Submission::Cancel { handle } => {
                    if let Some(callback) = held.remove(&handle) {
                        callback(Err(MergeError::Canceled));
                    }
                }
            }
        }
    });

    let params = MergerParams::new(ns()).add_remote(
        RemoteCursorHandle::new("shard0:27017", ns(), 33)
            .with_initial_batch(vec![json!({"x": 1})]),
    );
    let merger = ResultsMerger::new(OperationContext::new(), executor, params).unwrap();

    assert_eq!(merger.next_ready().unwrap(), Some(json!({"x": 1})));
    assert!(!merger.ready());
    let event = merger.next_event().unwrap();

    let kill_event = merger.kill(None).expect("kill event");
    kill_event.wait().await;
    event.wait().await;

    let kills = kills.lock().unwrap();
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0]["killCursors"], json!("coll"));
    assert_eq!(kills[0]["cursors"], json!([33]));
}
