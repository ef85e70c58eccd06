use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::Message;
use wsrpc::SharedEncoder;

/// An open connection as seen by senders.
pub(crate) struct Link {
    pub encoder: SharedEncoder,
    pub tx: mpsc::UnboundedSender<Message>,
}

#[derive(Clone)]
enum GateState {
    Pending,
    Ready(Arc<Link>),
    Closed,
}

/// Holds senders back until a connection is open and its encoder is known.
///
/// Re-armed whenever the connection is lost, so sends issued while
/// reconnecting wait for the next connection instead of failing.
pub(crate) struct ReadinessGate {
    state: watch::Sender<GateState>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Pending);
        Self { state }
    }

    pub fn open(&self, link: Link) {
        self.state.send_replace(GateState::Ready(Arc::new(link)));
    }

    pub fn arm(&self) {
        self.state.send_replace(GateState::Pending);
    }

    pub fn close(&self) {
        self.state.send_replace(GateState::Closed);
    }

    /// Waits for the gate to open. `None` once the client is closed for good.
    pub async fn ready(&self) -> Option<Arc<Link>> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| !matches!(state, GateState::Pending))
            .await
            .ok()?
            .clone();
        match state {
            GateState::Ready(link) => Some(link),
            _ => None,
        }
    }
}
