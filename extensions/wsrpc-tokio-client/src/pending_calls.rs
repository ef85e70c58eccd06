use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use wsrpc::{RpcError, RpcId};

type Settlement = Result<Value, RpcError>;

struct PendingCall {
    method: String,
    tx: oneshot::Sender<Settlement>,
}

/// Calls awaiting their answer, keyed by request id.
///
/// An entry leaves the table exactly once: settled by a matching answer,
/// removed on timeout or send failure, or dropped when the client closes for
/// good. Answers for ids that are not in the table are ignored.
#[derive(Clone, Default)]
pub struct PendingCalls {
    calls: Arc<Mutex<HashMap<u64, PendingCall>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: u64, method: &str) -> oneshot::Receiver<Settlement> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().await.insert(
            id,
            PendingCall {
                method: method.to_string(),
                tx,
            },
        );
        rx
    }

    /// Hands `outcome` to the call waiting on `id`. Returns `false` when no
    /// call is waiting.
    pub async fn settle(&self, id: &RpcId, outcome: Settlement) -> bool {
        let Some(id) = id.as_u64() else {
            return false;
        };
        let Some(call) = self.calls.lock().await.remove(&id) else {
            tracing::debug!("Dropping answer for unknown call {}", id);
            return false;
        };
        tracing::trace!("Settling '{}' ({})", call.method, id);
        // The caller may have given up in the meantime.
        call.tx.send(outcome).is_ok()
    }

    pub async fn remove(&self, id: u64) -> bool {
        self.calls.lock().await.remove(&id).is_some()
    }

    pub async fn contains(&self, id: u64) -> bool {
        self.calls.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.calls.lock().await.is_empty()
    }

    /// Drops every waiting call; their receivers observe a closed channel.
    pub async fn clear(&self) {
        let dropped = std::mem::take(&mut *self.calls.lock().await);
        if !dropped.is_empty() {
            tracing::debug!("Abandoning {} pending call(s)", dropped.len());
        }
    }
}
