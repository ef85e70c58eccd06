use crate::backoff::ReconnectPolicy;
use crate::client_config::ClientConfig;
use crate::constants::CLOSE_HANDSHAKE_TIMEOUT;
use crate::lifecycle::LifecycleEvent;
use crate::pending_calls::PendingCalls;
use crate::readiness_gate::{Link, ReadinessGate};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use wsrpc::{
    EncoderRegistry, EventEmitter, RpcEncoder, RpcMessage, RpcPacket, SharedEncoder,
    json_encoder, parse_message,
};

pub(crate) type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

pub(crate) enum Control {
    Close(String),
}

/// State shared between the client handle and its connection task.
pub(crate) struct ClientShared {
    pub config: ClientConfig,
    pub encoders: EncoderRegistry,
    pub pending: PendingCalls,
    pub gate: ReadinessGate,
    pub state: watch::Sender<ConnectionState>,
    pub events: EventEmitter<[Value]>,
    pub lifecycle: EventEmitter<LifecycleEvent>,
}

impl ClientShared {
    pub fn new(config: ClientConfig) -> Self {
        let encoders = EncoderRegistry::with_encoders(config.encoders.iter().cloned());
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            config,
            encoders,
            pending: PendingCalls::new(),
            gate: ReadinessGate::new(),
            state,
            events: EventEmitter::new(),
            lifecycle: EventEmitter::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("Connection state {:?} -> {:?}", previous, state);
        }
    }

    /// Moves from Closed to Connecting in one step. Returns `false` if the
    /// client was not closed, so only one caller gets to open it.
    pub fn claim_open(&self) -> bool {
        let claimed = self.state.send_if_modified(|state| {
            if *state != ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Connecting;
            true
        });
        if claimed {
            tracing::debug!("Connection state Closed -> Connecting");
        }
        claimed
    }

    fn notify(&self, event: LifecycleEvent) {
        self.lifecycle.emit(event.name(), &event);
    }
}

fn to_io_error(err: tungstenite::Error) -> io::Error {
    match err {
        tungstenite::Error::Io(err) => err,
        other => io::Error::other(other),
    }
}

/// Opens a WebSocket to `url`, offering every registered encoder, and
/// resolves the encoder the server agreed to.
pub(crate) async fn establish(
    url: &str,
    encoders: &EncoderRegistry,
) -> io::Result<(Socket, SharedEncoder)> {
    let mut request = url.into_client_request().map_err(to_io_error)?;
    let offered = HeaderValue::from_str(&encoders.protocols().join(", ")).map_err(io::Error::other)?;
    request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, offered);

    let (mut socket, response) = connect_async(request).await.map_err(to_io_error)?;
    let agreed = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok());

    match encoders.from_protocol(agreed) {
        Ok(encoder) => {
            tracing::debug!("Connected to {} using '{}'", url, encoder.name());
            Ok((socket, encoder))
        }
        Err(err) => {
            let _ = socket.close(None).await;
            Err(io::Error::new(io::ErrorKind::InvalidData, err))
        }
    }
}

struct SessionEnd {
    code: Option<u16>,
    reason: String,
    explicit: bool,
}

/// Drives the connection for the lifetime of the client: runs each session,
/// then reconnects or shuts down according to the reconnect policy.
pub(crate) async fn run(
    shared: Arc<ClientShared>,
    socket: Socket,
    encoder: SharedEncoder,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let mut policy = ReconnectPolicy::new(&shared.config.reconnect);
    let mut established = Some((socket, encoder));

    loop {
        let (socket, encoder) = match established.take() {
            Some(established) => established,
            None => {
                shared.set_state(ConnectionState::Connecting);
                let attempt = tokio::select! {
                    attempt = establish(&shared.config.url, &shared.encoders) => attempt,
                    _ = control.recv() => break,
                };
                match attempt {
                    Ok(established) => established,
                    Err(err) => {
                        tracing::warn!("Reconnecting to {} failed: {}", shared.config.url, err);
                        shared.notify(LifecycleEvent::Error(err.to_string()));
                        let Some(delay) = policy.on_close(None, false) else {
                            break;
                        };
                        if wait_unless_closed(delay, &mut control).await {
                            continue;
                        }
                        break;
                    }
                }
            }
        };

        policy.on_open();
        let end = session(&shared, socket, encoder, &mut control).await;

        shared.gate.arm();
        tracing::info!("Disconnected from {} ({:?}): {}", shared.config.url, end.code, end.reason);
        shared.notify(LifecycleEvent::Disconnected {
            code: end.code,
            reason: end.reason,
        });

        match policy.on_close(end.code, end.explicit) {
            Some(delay) => {
                shared.set_state(ConnectionState::Connecting);
                tracing::debug!("Reconnecting in {:?}", delay);
                if !wait_unless_closed(delay, &mut control).await {
                    break;
                }
            }
            None => break,
        }
    }

    shared.gate.close();
    shared.pending.clear().await;
    shared.set_state(ConnectionState::Closed);
}

/// Sleeps for `delay`. Returns `false` if a close was requested first.
async fn wait_unless_closed(delay: Duration, control: &mut mpsc::UnboundedReceiver<Control>) -> bool {
    tokio::select! {
        _ = sleep(delay) => true,
        _ = control.recv() => false,
    }
}

async fn session(
    shared: &ClientShared,
    socket: Socket,
    encoder: SharedEncoder,
    control: &mut mpsc::UnboundedReceiver<Control>,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    shared.gate.open(Link {
        encoder: encoder.clone(),
        tx,
    });
    shared.set_state(ConnectionState::Open);
    shared.notify(LifecycleEvent::Connected);

    loop {
        tokio::select! {
            Some(message) = rx.recv() => {
                if let Err(err) = sink.send(message).await {
                    return SessionEnd { code: None, reason: err.to_string(), explicit: false };
                }
            }

            request = control.recv() => {
                let reason = match request {
                    Some(Control::Close(reason)) => reason,
                    None => String::from("client dropped"),
                };
                shared.set_state(ConnectionState::Closing);
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: reason.clone().into(),
                };
                if sink.send(Message::Close(Some(frame))).await.is_ok() {
                    // Wait for the server to acknowledge the close.
                    let _ = timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                        while let Some(Ok(_)) = stream.next().await {}
                    })
                    .await;
                }
                return SessionEnd {
                    code: Some(u16::from(CloseCode::Normal)),
                    reason,
                    explicit: true,
                };
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        // Text frames are JSON regardless of the negotiated encoder.
                        handle_inbound(shared, json_encoder().as_ref(), text.as_str().as_bytes()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        handle_inbound(shared, encoder.as_ref(), &bytes).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                            None => (None, String::new()),
                        };
                        return SessionEnd { code, reason, explicit: false };
                    }
                    // Pings are answered by the transport while the stream is polled.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        return SessionEnd { code: None, reason: err.to_string(), explicit: false };
                    }
                    None => {
                        return SessionEnd { code: None, reason: String::from("connection lost"), explicit: false };
                    }
                }
            }
        }
    }
}

async fn handle_inbound(shared: &ClientShared, encoder: &dyn RpcEncoder, bytes: &[u8]) {
    let decoded = match encoder.decode(bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!("Dropping undecodable frame: {}", err);
            shared.notify(LifecycleEvent::Error(err.to_string()));
            return;
        }
    };
    shared.notify(LifecycleEvent::Message(decoded.clone()));

    for item in RpcPacket::from_value(decoded).into_items() {
        match parse_message(&item) {
            Ok(RpcMessage::Response { id, result }) => {
                shared.pending.settle(&id, Ok(result)).await;
            }
            Ok(RpcMessage::Error { id, error }) => {
                if id.is_null() {
                    tracing::warn!("Server reported an error: {}", error);
                    shared.notify(LifecycleEvent::Error(error.to_string()));
                } else {
                    shared.pending.settle(&id, Err(error)).await;
                }
            }
            Ok(RpcMessage::Event { method, args }) => {
                shared.events.emit(&method, args.as_slice());
            }
            Ok(RpcMessage::Request { method, .. }) => {
                tracing::warn!("Ignoring request '{}' sent by the server", method);
            }
            Err(err) => {
                tracing::warn!("Invalid message from server: {}", err.kind);
                shared.notify(LifecycleEvent::Error(err.kind.to_string()));
            }
        }
    }
}
