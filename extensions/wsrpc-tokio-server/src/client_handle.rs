use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use wsrpc::{EncodeError, FrameKind, RpcEncoder, SharedEncoder};

/// A frame queued for a connection's sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Bytes),
    Ping,
    /// Ends the sender task once every frame queued before it was written.
    Close,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("client {0} is disconnected")]
    Disconnected(String),
}

struct ClientRecord {
    id: String,
    encoder: SharedEncoder,
    remote_addr: Option<SocketAddr>,
    tx: mpsc::UnboundedSender<OutboundFrame>,
    alive: AtomicBool,
    terminate: Notify,
}

/// The server-side record of one accepted connection.
///
/// Cloning is cheap; every clone refers to the same connection. Sends never
/// block: frames are queued for the connection's sender task, and once that
/// task is gone every send reports [`SendError::Disconnected`].
#[derive(Clone)]
pub struct ClientHandle {
    inner: Arc<ClientRecord>,
}

impl ClientHandle {
    pub fn new(
        id: impl Into<String>,
        encoder: SharedEncoder,
        tx: mpsc::UnboundedSender<OutboundFrame>,
    ) -> Self {
        Self::with_remote_addr(id, encoder, tx, None)
    }

    pub fn with_remote_addr(
        id: impl Into<String>,
        encoder: SharedEncoder,
        tx: mpsc::UnboundedSender<OutboundFrame>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientRecord {
                id: id.into(),
                encoder,
                remote_addr,
                tx,
                alive: AtomicBool::new(true),
                terminate: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The encoder negotiated for this connection.
    pub fn encoder(&self) -> &SharedEncoder {
        &self.inner.encoder
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.remote_addr
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Records a pong.
    pub fn mark_alive(&self) {
        self.inner.alive.store(true, Ordering::Release);
    }

    /// Clears the liveness flag, returning whether it was set.
    pub(crate) fn take_alive(&self) -> bool {
        self.inner.alive.swap(false, Ordering::AcqRel)
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.tx.is_closed()
    }

    /// Queues a ping. Returns `false` if the connection is already gone.
    pub fn ping(&self) -> bool {
        self.inner.tx.send(OutboundFrame::Ping).is_ok()
    }

    /// Queues the closing frame behind everything already queued.
    pub(crate) fn close_outbound(&self) -> bool {
        self.inner.tx.send(OutboundFrame::Close).is_ok()
    }

    /// Asks the connection's receiver loop to drop the transport.
    pub fn terminate(&self) {
        self.inner.terminate.notify_one();
    }

    pub(crate) async fn terminated(&self) {
        self.inner.terminate.notified().await
    }

    /// Encodes `packet` with the negotiated encoder and queues it.
    pub fn send(&self, packet: &Value) -> Result<(), SendError> {
        self.send_with(self.inner.encoder.as_ref(), packet)
    }

    /// Encodes `packet` with an explicit encoder, bypassing the negotiated one.
    pub fn send_with(&self, encoder: &dyn RpcEncoder, packet: &Value) -> Result<(), SendError> {
        let bytes = encoder.encode(packet)?;
        let frame = match encoder.frame_kind() {
            FrameKind::Text => OutboundFrame::Text(
                String::from_utf8(bytes).map_err(|err| EncodeError::new(encoder.name(), err))?,
            ),
            FrameKind::Binary => OutboundFrame::Binary(Bytes::from(bytes)),
        };
        self.inner
            .tx
            .send(frame)
            .map_err(|_| SendError::Disconnected(self.inner.id.clone()))
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.inner.id)
            .field("encoder", &self.inner.encoder.name())
            .field("remote_addr", &self.inner.remote_addr)
            .field("alive", &self.is_alive())
            .finish()
    }
}
