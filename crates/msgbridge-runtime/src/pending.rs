//! Pending-request table

use msgbridge_core::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// Receiver side of a pending request
pub(crate) type PendingReply = oneshot::Receiver<BridgeResult<Value>>;

/// One outstanding request
struct PendingRequest {
    settle: oneshot::Sender<BridgeResult<Value>>,
    timer: Option<AbortHandle>,
}

/// Outstanding requests keyed by request id
///
/// Every settlement path (response, timeout, disconnect) goes through
/// [`PendingTable::settle`], which removes the entry under the lock before
/// completing it. Only the first path to claim an id settles it.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<u64, PendingRequest>>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a request and get the receiver its result arrives on
    pub(crate) fn register(&self, request_id: u64) -> PendingReply {
        let (settle, reply) = oneshot::channel();
        let previous = self.entries.lock().insert(
            request_id,
            PendingRequest {
                settle,
                timer: None,
            },
        );
        debug_assert!(previous.is_none(), "request id {} reused", request_id);
        reply
    }

    /// Attach the timeout timer of a request
    ///
    /// Returns false (and aborts the timer) when the request already settled.
    pub(crate) fn arm(&self, request_id: u64, timer: AbortHandle) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(&request_id) {
            Some(entry) => {
                entry.timer = Some(timer);
                true
            }
            None => {
                timer.abort();
                false
            }
        }
    }

    /// Settle a request if it is still pending
    ///
    /// Returns false when the id is unknown or was already settled.
    pub(crate) fn settle(&self, request_id: u64, result: BridgeResult<Value>) -> bool {
        let Some(entry) = self.entries.lock().remove(&request_id) else {
            return false;
        };
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        // The caller may have stopped waiting; the entry is gone either way.
        let _ = entry.settle.send(result);
        true
    }

    /// Reject every pending request, returning how many were rejected
    pub(crate) fn reject_all(&self, reason: &BridgeError) -> usize {
        let drained: Vec<(u64, PendingRequest)> = self.entries.lock().drain().collect();
        let count = drained.len();
        for (_, entry) in drained {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            let _ = entry.settle.send(Err(reason.clone()));
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, request_id: u64) -> bool {
        self.entries.lock().contains_key(&request_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
