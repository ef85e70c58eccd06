use crate::call_error::RpcCallError;
use crate::client_config::ClientConfig;
use crate::connection::{self, ClientShared, ConnectionState, Control, establish};
use crate::lifecycle::LifecycleEvent;
use bytes::Bytes;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, timeout_at};
use tokio_tungstenite::tungstenite::protocol::Message;
use wsrpc::{
    EncodeError, EncoderRegistry, FrameKind, RpcError, RpcId, RpcMessage, RpcPacket, Subscription,
};

/// A WebSocket RPC client.
///
/// Calls issued while the connection is (re)established wait for it, up to
/// the configured timeout. Each call is settled independently: by its answer,
/// by its timeout, or by a failure to send it.
pub struct RpcClient {
    shared: Arc<ClientShared>,
    next_id: AtomicU64,
    control: Mutex<Option<mpsc::UnboundedSender<Control>>>,
}

impl RpcClient {
    /// Creates a client without connecting it. Subscribe to events here to
    /// observe everything from the first connection on, then call
    /// [`RpcClient::open`].
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(ClientShared::new(config)),
            next_id: AtomicU64::new(1),
            control: Mutex::new(None),
        }
    }

    /// Creates a client and opens its first connection.
    pub async fn connect(config: ClientConfig) -> io::Result<Self> {
        let client = Self::new(config);
        client.open().await?;
        Ok(client)
    }

    /// Opens the connection. The first attempt is made here and its failure
    /// is returned as is; later reconnects happen in the background.
    ///
    /// Does nothing unless the client is closed.
    pub async fn open(&self) -> io::Result<()> {
        if !self.shared.claim_open() {
            return Ok(());
        }

        self.shared.gate.arm();
        let (socket, encoder) = match establish(&self.shared.config.url, &self.shared.encoders).await {
            Ok(established) => established,
            Err(err) => {
                tracing::warn!("Connecting to {} failed: {}", self.shared.config.url, err);
                self.shared.gate.close();
                self.shared.set_state(ConnectionState::Closed);
                return Err(err);
            }
        };

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *self.control.lock().unwrap_or_else(PoisonError::into_inner) = Some(control_tx);
        tokio::spawn(connection::run(self.shared.clone(), socket, encoder, control_rx));
        Ok(())
    }

    /// Closes the connection for good and waits until it is closed. Pending
    /// calls are abandoned. Does nothing if the client is already closed.
    pub async fn close(&self, reason: &str) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        let control = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(control) = control else {
            return;
        };
        if control.send(Control::Close(reason.to_string())).is_err() {
            return;
        }

        let mut state = self.shared.state.subscribe();
        let _ = state
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn encoders(&self) -> &EncoderRegistry {
        &self.shared.encoders
    }

    /// Number of calls still waiting for an answer.
    pub async fn pending_count(&self) -> usize {
        self.shared.pending.len().await
    }

    /// Subscribes to an event pushed by the server.
    pub fn on_event<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.shared.events.on(event, handler)
    }

    /// Subscribes to one of the `rpc.*` connection notifications.
    pub fn on_lifecycle<F>(&self, name: &str, handler: F) -> Subscription
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.shared.lifecycle.on(name, handler)
    }

    /// Calls `method` and waits for its result.
    pub async fn rpc(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcCallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.shared.config.timeout;
        let answer = self.shared.pending.register(id, method).await;

        let request = RpcMessage::request(id, method, args).to_value();
        let sent = match timeout_at(deadline, self.transmit(&request)).await {
            Ok(sent) => sent,
            Err(_) => Err(self.timeout_error(RpcId::from(id), method)),
        };
        if let Err(err) = sent {
            self.shared.pending.remove(id).await;
            return Err(err);
        }

        self.await_answer(id, method, answer, deadline).await
    }

    /// Like [`RpcClient::rpc`], deserializing the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<T, RpcCallError> {
        let value = self.rpc(method, args).await?;
        serde_json::from_value(value).map_err(|err| RpcCallError::InvalidResult {
            method: method.to_string(),
            reason: err.to_string(),
        })
    }

    /// Sends several calls in one batch frame. Results come back in the order
    /// of `calls`, each settled on its own.
    pub async fn call_batch(&self, calls: Vec<(String, Vec<Value>)>) -> Vec<Result<Value, RpcCallError>> {
        if calls.is_empty() {
            return Vec::new();
        }

        let deadline = Instant::now() + self.shared.config.timeout;
        let mut waiting = Vec::with_capacity(calls.len());
        let mut requests = Vec::with_capacity(calls.len());
        for (method, args) in calls {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let answer = self.shared.pending.register(id, &method).await;
            requests.push(RpcMessage::request(id, method.as_str(), args));
            waiting.push((id, method, answer));
        }

        let packet: Value = RpcPacket::Batch(requests).into();
        let failure = match timeout_at(deadline, self.transmit(&packet)).await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(_) => Some(RpcCallError::Closed),
        };

        if let Some(failure) = failure {
            let timed_out = Instant::now() >= deadline;
            let mut results = Vec::with_capacity(waiting.len());
            for (id, method, _) in waiting {
                self.shared.pending.remove(id).await;
                results.push(Err(if timed_out {
                    self.timeout_error(RpcId::from(id), &method)
                } else {
                    failure.clone()
                }));
            }
            return results;
        }

        join_all(
            waiting
                .into_iter()
                .map(|(id, method, answer)| async move {
                    self.await_answer(id, &method, answer, deadline).await
                }),
        )
        .await
    }

    /// Sends an event. Only waits for the connection, never for the server.
    pub async fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), RpcCallError> {
        let packet = RpcMessage::event(event, args).to_value();
        match timeout_at(Instant::now() + self.shared.config.timeout, self.transmit(&packet)).await {
            Ok(sent) => sent,
            Err(_) => Err(self.timeout_error(RpcId::Null, event)),
        }
    }

    async fn await_answer(
        &self,
        id: u64,
        method: &str,
        answer: oneshot::Receiver<Result<Value, RpcError>>,
        deadline: Instant,
    ) -> Result<Value, RpcCallError> {
        match timeout_at(deadline, answer).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(error))) => Err(RpcCallError::remote(RpcId::from(id), method, error)),
            Ok(Err(_)) => Err(RpcCallError::Closed),
            Err(_) => {
                // A late answer for this id is dropped once the entry is gone.
                self.shared.pending.remove(id).await;
                tracing::debug!("'{}' ({}) timed out", method, id);
                Err(self.timeout_error(RpcId::from(id), method))
            }
        }
    }

    /// Waits for the readiness gate, encodes and queues one unit.
    async fn transmit(&self, packet: &Value) -> Result<(), RpcCallError> {
        let link = self.shared.gate.ready().await.ok_or(RpcCallError::Closed)?;
        let bytes = link.encoder.encode(packet)?;
        let message = match link.encoder.frame_kind() {
            FrameKind::Text => Message::Text(
                String::from_utf8(bytes)
                    .map_err(|err| EncodeError::new(link.encoder.name(), err))?
                    .into(),
            ),
            FrameKind::Binary => Message::Binary(Bytes::from(bytes)),
        };
        link.tx.send(message).map_err(|_| {
            RpcCallError::Transport(String::from("connection lost before the frame was sent"))
        })
    }

    fn timeout_error(&self, id: RpcId, method: &str) -> RpcCallError {
        RpcCallError::Timeout {
            id,
            method: method.to_string(),
            timeout: self.shared.config.timeout,
        }
    }
}
