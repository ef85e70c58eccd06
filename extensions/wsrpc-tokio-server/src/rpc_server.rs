//! Note: This `RpcServer` does not include authentication or authorization
//! mechanisms. Anything that can reach the endpoint can call every method the
//! installed handler accepts.

use crate::client_handle::{ClientHandle, OutboundFrame};
use crate::client_registry::ClientRegistry;
use crate::constants::{CLOSE_DRAIN_TIMEOUT, WS_ROUTE};
use crate::context::Context;
use crate::handler::{BoxError, HandlerResult};
use crate::rpc_dispatcher::{DispatchScope, RpcDispatcher};
use crate::server_config::ServerConfig;
use crate::utils::generate_client_id;
use axum::{
    Router,
    extract::ConnectInfo,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::{HeaderMap, header::SEC_WEBSOCKET_PROTOCOL},
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use wsrpc::{
    EncoderRegistry, SharedEncoder, events::CLIENT_CONNECTED, parse_protocol_header,
    protocol_token,
};

/// A WebSocket RPC server.
///
/// Handlers are installed builder-style before the server is shared:
///
/// ```ignore
/// let server = RpcServer::new(ServerConfig::default())
///     .on_rpc(|_ctx, method, args| async move {
///         match method.as_str() {
///             "echo" => Ok(args.into_iter().next().unwrap_or_default().into()),
///             _ => Err(RpcError::method_not_found(Some(method.into())).into()),
///         }
///     });
/// ```
pub struct RpcServer<C = ()> {
    config: ServerConfig,
    encoders: EncoderRegistry,
    clients: ClientRegistry,
    dispatcher: RpcDispatcher<C>,
    global: Arc<C>,
}

impl Default for RpcServer<()> {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl RpcServer<()> {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_context(config, ())
    }
}

impl<C: Send + Sync + 'static> RpcServer<C> {
    /// Creates a server carrying a user-supplied value reachable from every
    /// handler through [`Context::global`].
    pub fn with_context(config: ServerConfig, global: C) -> Self {
        let encoders = EncoderRegistry::with_encoders(config.encoders.iter().cloned());
        let dispatcher = RpcDispatcher::new(config.max_batch);
        Self {
            config,
            encoders,
            clients: ClientRegistry::new(),
            dispatcher,
            global: Arc::new(global),
        }
    }

    /// Installs the request handler. Without one every request is answered
    /// with MethodNotFound.
    pub fn on_rpc<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context<C>, String, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.dispatcher.set_rpc_handler(handler);
        self
    }

    /// Installs the event handler. Without one incoming events are dropped.
    pub fn on_event<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context<C>, String, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.dispatcher.set_event_handler(handler);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn encoders(&self) -> &EncoderRegistry {
        &self.encoders
    }

    /// Returns a handle to the live-clients table.
    pub fn clients(&self) -> ClientRegistry {
        self.clients.clone()
    }

    pub fn global(&self) -> &C {
        &self.global
    }

    pub async fn emit<S: AsRef<str>>(
        &self,
        client_ids: &[S],
        event: &str,
        args: Vec<Value>,
    ) -> Vec<bool> {
        self.clients.emit(client_ids, event, args).await
    }

    pub async fn emit_all(&self, event: &str, args: Vec<Value>) -> Vec<bool> {
        self.clients.emit_all(event, args).await
    }

    pub async fn has_client(&self, client_id: &str) -> bool {
        self.clients.contains(client_id).await
    }

    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.ids().await
    }

    pub async fn client(&self, client_id: &str) -> Option<ClientHandle> {
        self.clients.get(client_id).await
    }

    /// Picks the encoder for a handshake from the client's offered
    /// subprotocols, in the client's order. `None` means nothing offered
    /// matched and the connection falls back to JSON without echoing a token.
    pub fn negotiate(&self, headers: &HeaderMap) -> Option<SharedEncoder> {
        let offered: Vec<&str> = headers
            .get_all(SEC_WEBSOCKET_PROTOCOL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_protocol_header)
            .collect();
        self.encoders.negotiate(offered)
    }

    /// Builds the `Router` with the WebSocket endpoint mounted at `/ws`.
    ///
    /// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`.
    /// The liveness sweep is not started by this; see
    /// [`RpcServer::spawn_liveness`].
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route(
            WS_ROUTE,
            get({
                let server = self.clone();
                move |ws: WebSocketUpgrade,
                      conn: ConnectInfo<SocketAddr>,
                      headers: HeaderMap| { Self::ws_handler(ws, conn, headers, server) }
            }),
        )
    }

    /// Starts the periodic ping/pong sweep over all live connections.
    pub fn spawn_liveness(&self) -> JoinHandle<()> {
        tokio::spawn(Self::liveness_task(
            self.clients.clone(),
            self.config.ping_interval,
        ))
    }

    /// Binds to an address and starts the RPC server.
    ///
    /// The address can be any type that implements `ToSocketAddrs`, such as
    /// a string "127.0.0.1:8080" or a `SocketAddr`.
    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> Result<SocketAddr, axum::BoxError> {
        let listener = TcpListener::bind(addr).await?;
        let server = Arc::new(self);
        server.serve_with_listener(listener).await
    }

    /// Starts the RPC server on a specific host and port.
    pub async fn serve_on(self, host: &str, port: u16) -> Result<SocketAddr, axum::BoxError> {
        let addr = format!("{host}:{port}");
        self.serve(addr).await
    }

    /// Starts the RPC server with a pre-bound `TcpListener`.
    ///
    /// This is useful for binding to an ephemeral port (port 0) and then
    /// retrieving the actual address.
    pub async fn serve_with_listener(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> Result<SocketAddr, axum::BoxError> {
        let address = listener.local_addr()?;
        let liveness = self.spawn_liveness();
        let app = self.router();

        tracing::info!("Server running on {:?}", address);
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;

        liveness.abort();
        served?;
        Ok(address)
    }

    async fn ws_handler(
        ws: WebSocketUpgrade,
        ConnectInfo(addr): ConnectInfo<SocketAddr>,
        headers: HeaderMap,
        server: Arc<Self>,
    ) -> impl IntoResponse {
        let (ws, encoder) = match server.negotiate(&headers) {
            Some(encoder) => (ws.protocols([protocol_token(encoder.name())]), encoder),
            None => (ws, server.encoders.json()),
        };
        tracing::debug!("Handshake from {} negotiated '{}'", addr, encoder.name());
        ws.on_upgrade(move |socket| server.handle_socket(socket, addr, encoder))
    }

    /// Runs one accepted connection until it closes or is terminated.
    ///
    /// Reading the socket, dispatching frames and writing replies run as
    /// separate tasks, so pongs and termination are seen while handlers are
    /// still busy.
    async fn handle_socket(self: Arc<Self>, socket: WebSocket, addr: SocketAddr, encoder: SharedEncoder) {
        let (sender, receiver) = socket.split();
        let (tx, rx) = mpsc::unbounded_channel::<OutboundFrame>();

        let client = ClientHandle::with_remote_addr(generate_client_id(), encoder, tx, Some(addr));
        self.clients.insert(client.clone()).await;
        tracing::info!(
            "Client {} connected from {} using '{}'",
            client.id(),
            addr,
            client.encoder().name()
        );

        let mut sender_task = tokio::spawn(Self::sender_task(sender, rx));

        self.clients
            .emit_to(
                client.id(),
                CLIENT_CONNECTED,
                vec![Value::String(client.id().to_string())],
            )
            .await;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Bytes>();
        tokio::spawn(self.clone().dispatch_task(client.clone(), inbound_rx));

        Self::receiver_task(&client, receiver, inbound_tx).await;

        self.clients.remove(client.id()).await;
        client.close_outbound();
        if timeout(CLOSE_DRAIN_TIMEOUT, &mut sender_task).await.is_err() {
            tracing::debug!("Outbound queue of {} not drained in time", client.id());
            sender_task.abort();
        }
        tracing::info!("Terminated connection for {} ({}).", client.id(), addr);
    }

    /// Forwards queued frames to the WebSocket until the queue is closed or
    /// the client goes away.
    async fn sender_task(
        mut sender: SplitSink<WebSocket, Message>,
        mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    ) {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                OutboundFrame::Text(text) => Message::Text(text.into()),
                OutboundFrame::Binary(bytes) => Message::Binary(bytes),
                OutboundFrame::Ping => Message::Ping(Bytes::new()),
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break; // Exit if the client has disconnected.
            }
        }
    }

    /// Dispatches the frames of one connection one after another, so reply
    /// batches leave in the order their frames arrived. The items of a batch
    /// run concurrently.
    async fn dispatch_task(self: Arc<Self>, client: ClientHandle, mut inbound: mpsc::UnboundedReceiver<Bytes>) {
        let scope = DispatchScope {
            client,
            clients: self.clients.clone(),
            global: self.global.clone(),
        };

        while let Some(bytes) = inbound.recv().await {
            self.process(&scope, &bytes).await;
        }
    }

    /// Reads the socket, answering liveness and handing data frames to the
    /// dispatch task.
    async fn receiver_task(
        client: &ClientHandle,
        mut receiver: SplitStream<WebSocket>,
        inbound: mpsc::UnboundedSender<Bytes>,
    ) {
        loop {
            let frame = tokio::select! {
                _ = client.terminated() => {
                    tracing::info!("Client {} terminated by server.", client.id());
                    break;
                }

                message = receiver.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => Bytes::copy_from_slice(text.as_str().as_bytes()),
                        Some(Ok(Message::Binary(bytes))) => bytes,
                        // Client responded to our ping, it's still alive.
                        Some(Ok(Message::Pong(_))) => {
                            tracing::trace!("Received pong from {}", client.id());
                            client.mark_alive();
                            continue;
                        }
                        Some(Ok(Message::Ping(_))) => continue,
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Client {} initiated close.", client.id());
                            break;
                        }
                        Some(Err(err)) => {
                            tracing::info!("Client {} disconnected: {}", client.id(), err);
                            break;
                        }
                        None => {
                            tracing::info!("Client {} disconnected.", client.id());
                            break;
                        }
                    }
                }
            };

            if inbound.send(frame).is_err() {
                break;
            }
        }
    }

    async fn process(&self, scope: &DispatchScope<C>, bytes: &[u8]) {
        tracing::trace!("Frame of {} bytes from {}", bytes.len(), scope.client.id());
        if let Some(reply) = self.dispatcher.handle_frame(scope, bytes).await {
            reply.deliver(&scope.client);
        }
    }

    async fn liveness_task(clients: ClientRegistry, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = clients.sweep().await;
            if !evicted.is_empty() {
                tracing::debug!("Liveness sweep evicted {} client(s)", evicted.len());
            }
        }
    }
}
