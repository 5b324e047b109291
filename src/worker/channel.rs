// src/worker/channel.rs
// =============================================================================
// The background channel: a dedicated thread that extracts diff blocks from
// markdown while the async main context keeps going.
//
// How it works:
// 1. `start` spawns the worker thread and a small router task
// 2. `dispatch` stores a oneshot sender under a fresh TaskId in the pending
//    table, then sends { id, content } to the worker
// 3. The worker runs the extractor and answers with { id, diff, has_diff }
//    or { id, error }
// 4. The router looks the id up in the pending table, removes the entry and
//    completes the matching oneshot. Replies for unknown ids are dropped.
//
// The worker shares no mutable state with the main context: requests go in
// over a std mpsc channel, replies come back over a tokio channel.
//
// Rust concepts:
// - std::thread::Builder: spawning a named thread, with an io::Error on failure
// - oneshot channels: a single value sent from one task to another
// - catch_unwind: turning a panic on the worker into an error reply
// =============================================================================

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::{mpsc as async_mpsc, oneshot};

use crate::content::{extract, ExtractError, Extraction};

const WORKER_THREAD_NAME: &str = "md-extract-worker";

// Correlates one request with its reply
//
// issued_at_ms is the dispatch time, seq keeps ids unique when two tasks are
// dispatched within the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    issued_at_ms: u64,
    seq: u64,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "md_{}_{}", self.issued_at_ms, self.seq)
    }
}

// Message sent to the worker thread
#[derive(Debug)]
pub struct ExtractRequest {
    pub id: TaskId,
    pub content: String,
}

// Message sent back by the worker thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractReply {
    Done {
        id: TaskId,
        diff: String,
        has_diff: bool,
        block_count: usize,
    },
    Failed {
        id: TaskId,
        error: String,
    },
}

impl ExtractReply {
    pub fn id(&self) -> TaskId {
        match self {
            ExtractReply::Done { id, .. } | ExtractReply::Failed { id, .. } => *id,
        }
    }

    pub fn into_result(self) -> Result<Extraction, ExtractError> {
        match self {
            ExtractReply::Done {
                diff, block_count, ..
            } => Ok(Extraction {
                combined_patch_text: diff,
                block_count,
            }),
            ExtractReply::Failed { error, .. } => Err(ExtractError::new(error)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no async runtime is running on this thread")]
    NoRuntime,

    #[error("could not spawn the extract worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("the extract worker is no longer running")]
    Disconnected,
}

type PendingTable = Arc<Mutex<HashMap<TaskId, oneshot::Sender<ExtractReply>>>>;

// Link to the extract worker thread
//
// Built once per session. If `start` fails the caller must fall back to
// inline extraction for the rest of the session.
pub struct BackgroundChannel {
    requests: mpsc::Sender<ExtractRequest>,
    pending: PendingTable,
    next_seq: u64,
}

// A dispatched task waiting for its reply
#[derive(Debug)]
pub struct PendingExtraction {
    id: TaskId,
    reply: oneshot::Receiver<ExtractReply>,
}

impl PendingExtraction {
    pub fn id(&self) -> TaskId {
        self.id
    }

    // Suspends until the router delivers the reply for this task
    pub async fn wait(self) -> Result<ExtractReply, ChannelError> {
        self.reply.await.map_err(|_| ChannelError::Disconnected)
    }
}

impl BackgroundChannel {
    // Spawns the worker thread and the reply router
    //
    // Fails when called outside a tokio runtime or when the OS refuses to
    // create the thread.
    pub fn start() -> Result<Self, ChannelError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ChannelError::NoRuntime)?;

        let (request_tx, request_rx) = mpsc::channel::<ExtractRequest>();
        let (reply_tx, reply_rx) = async_mpsc::unbounded_channel::<ExtractReply>();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || serve(request_rx, reply_tx))?;

        let pending = PendingTable::default();
        runtime.spawn(route_replies(reply_rx, Arc::clone(&pending)));

        log::debug!("started background channel on thread '{}'", WORKER_THREAD_NAME);

        Ok(Self {
            requests: request_tx,
            pending,
            next_seq: 0,
        })
    }

    // Sends markdown to the worker and returns a handle for the reply
    pub fn dispatch(&mut self, content: String) -> Result<PendingExtraction, ChannelError> {
        let id = self.next_task_id();
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id, reply_tx);

        if self.requests.send(ExtractRequest { id, content }).is_err() {
            lock(&self.pending).remove(&id);
            return Err(ChannelError::Disconnected);
        }

        log::debug!("dispatched extraction task {}", id);
        Ok(PendingExtraction {
            id,
            reply: reply_rx,
        })
    }

    // Number of dispatched tasks still waiting for a reply
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    // A channel whose worker takes requests but never answers
    #[cfg(test)]
    pub fn stalled() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<ExtractRequest>();
        thread::spawn(move || for _ in request_rx {});
        Self::from_sender(request_tx)
    }

    // A channel whose worker has already exited
    #[cfg(test)]
    pub fn exited() -> Self {
        let (request_tx, _) = mpsc::channel::<ExtractRequest>();
        Self::from_sender(request_tx)
    }

    #[cfg(test)]
    fn from_sender(requests: mpsc::Sender<ExtractRequest>) -> Self {
        Self {
            requests,
            pending: PendingTable::default(),
            next_seq: 0,
        }
    }

    fn next_task_id(&mut self) -> TaskId {
        let issued_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.next_seq += 1;
        TaskId {
            issued_at_ms,
            seq: self.next_seq,
        }
    }
}

fn lock(pending: &PendingTable) -> MutexGuard<'_, HashMap<TaskId, oneshot::Sender<ExtractReply>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

// Worker thread body: one reply per request until the sender side is dropped
fn serve(requests: mpsc::Receiver<ExtractRequest>, replies: async_mpsc::UnboundedSender<ExtractReply>) {
    while let Ok(request) = requests.recv() {
        if replies.send(handle_request(request)).is_err() {
            break;
        }
    }
    log::debug!("extract worker stopped");
}

fn handle_request(request: ExtractRequest) -> ExtractReply {
    let ExtractRequest { id, content } = request;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extract(&content)))
        .unwrap_or_else(|payload| Err(ExtractError::new(panic_reason(payload.as_ref()))));

    match outcome {
        Ok(extraction) => ExtractReply::Done {
            id,
            has_diff: extraction.has_diff(),
            block_count: extraction.block_count,
            diff: extraction.combined_patch_text,
        },
        Err(err) => ExtractReply::Failed {
            id,
            error: err.reason,
        },
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "extract worker panicked".to_string()
    }
}

// Router task: completes the oneshot registered for each reply's id
async fn route_replies(mut replies: async_mpsc::UnboundedReceiver<ExtractReply>, pending: PendingTable) {
    while let Some(reply) = replies.recv().await {
        resolve(&pending, reply);
    }
}

// Returns false when the reply matched no pending task
fn resolve(pending: &PendingTable, reply: ExtractReply) -> bool {
    let id = reply.id();
    let waiter = lock(pending).remove(&id);

    match waiter {
        Some(waiter) => {
            if waiter.send(reply).is_err() {
                log::debug!("task {} finished after its caller gave up", id);
            }
            true
        }
        None => {
            log::warn!("ignoring reply for unknown extraction task {}", id);
            false
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a real thread and not tokio::spawn?
//    - tokio tasks share the runtime's threads; a long regex scan would hold
//      one of them hostage
//    - a std thread runs on its own and only talks through channels
//
// 2. Why Arc<Mutex<HashMap<...>>> for the pending table?
//    - dispatch (main task) inserts entries, the router task removes them
//    - Arc lets both own the table, Mutex makes each access exclusive
//    - the worker thread never sees the table
//
// 3. What does unwrap_or_else(PoisonError::into_inner) do?
//    - a Mutex is "poisoned" if a thread panicked while holding it
//    - the map itself is still usable, so we just take the guard back
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::time::Duration;

    fn task_id(seq: u64) -> TaskId {
        TaskId {
            issued_at_ms: 1,
            seq,
        }
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let result = BackgroundChannel::start();
        assert!(matches!(result, Err(ChannelError::NoRuntime)));
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(task_id(7).to_string(), "md_1_7");
    }

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let mut channel = BackgroundChannel::start().unwrap();
        let markup = "Intro\n```diff\n-old\n+new\n```\n".to_string();

        let pending = channel.dispatch(markup).unwrap();
        let id = pending.id();
        let reply = pending.wait().await.unwrap();

        assert_eq!(reply.id(), id);
        assert_eq!(
            reply,
            ExtractReply::Done {
                id,
                diff: "-old\n+new".to_string(),
                has_diff: true,
                block_count: 1,
            }
        );
        assert_eq!(channel.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_several_tasks_in_flight() {
        let mut channel = BackgroundChannel::start().unwrap();

        let pending: Vec<_> = (0..3)
            .map(|n| channel.dispatch(format!("```diff\n+line {}\n```", n)).unwrap())
            .collect();
        let ids: Vec<_> = pending.iter().map(PendingExtraction::id).collect();

        let replies = join_all(pending.into_iter().map(PendingExtraction::wait)).await;

        for (n, (id, reply)) in ids.iter().zip(replies).enumerate() {
            let reply = reply.unwrap();
            assert_eq!(reply.id(), *id);
            let extraction = reply.into_result().unwrap();
            assert_eq!(extraction.combined_patch_text, format!("+line {}", n));
        }
    }

    #[test]
    fn test_unknown_reply_is_ignored() {
        let pending = PendingTable::default();
        let (waiter, _receiver) = oneshot::channel();
        lock(&pending).insert(task_id(1), waiter);

        let stale = ExtractReply::Failed {
            id: task_id(99),
            error: "late".to_string(),
        };
        assert!(!resolve(&pending, stale));
        assert_eq!(lock(&pending).len(), 1);

        let fresh = ExtractReply::Done {
            id: task_id(1),
            diff: String::new(),
            has_diff: false,
            block_count: 0,
        };
        assert!(resolve(&pending, fresh));
        assert!(lock(&pending).is_empty());
    }

    #[test]
    fn test_dispatch_to_exited_worker() {
        let mut channel = BackgroundChannel::exited();
        let result = channel.dispatch("```diff\n+a\n```".to_string());
        assert!(matches!(result, Err(ChannelError::Disconnected)));
        assert_eq!(channel.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stalled_worker_keeps_task_in_flight() {
        let mut channel = BackgroundChannel::stalled();
        let pending = channel.dispatch("```diff\n+a\n```".to_string()).unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), pending.wait()).await;
        assert!(waited.is_err());
        assert_eq!(channel.in_flight(), 1);
    }

    #[test]
    fn test_failed_reply_becomes_extract_error() {
        let reply = ExtractReply::Failed {
            id: task_id(2),
            error: "boom".to_string(),
        };
        assert_eq!(reply.into_result(), Err(ExtractError::new("boom")));
    }

    #[test]
    fn test_handle_request_without_blocks() {
        let reply = handle_request(ExtractRequest {
            id: task_id(3),
            content: "no fences here".to_string(),
        });
        assert_eq!(
            reply,
            ExtractReply::Done {
                id: task_id(3),
                diff: String::new(),
                has_diff: false,
                block_count: 0,
            }
        );
    }
}
