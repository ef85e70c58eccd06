use crate::client_handle::{ClientHandle, SendError};
use crate::client_registry::ClientRegistry;
use crate::context::Context;
use crate::handler::{Answer, BoxError, EventHandler, HandlerResult, RpcHandler, ThrownError};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use wsrpc::{
    JsonEncoder, RpcError, RpcId, RpcMessage, RpcPacket, constants::DEFAULT_MAX_BATCH,
    parse_message,
};

/// Everything a frame is dispatched against: the connection it arrived on,
/// the live-clients table and the server-wide value.
pub struct DispatchScope<C> {
    pub client: ClientHandle,
    pub clients: ClientRegistry,
    pub global: Arc<C>,
}

impl<C> Clone for DispatchScope<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            clients: self.clients.clone(),
            global: self.global.clone(),
        }
    }
}

impl<C> DispatchScope<C> {
    fn context(&self, method: &str) -> Context<C> {
        Context::new(
            self.client.clone(),
            self.clients.clone(),
            method,
            self.global.clone(),
        )
    }
}

/// A unit ready to go back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub packet: Value,
    /// Send with JSON regardless of the negotiated encoder.
    pub json_fallback: bool,
}

impl Reply {
    fn new(packet: Value) -> Self {
        Self {
            packet,
            json_fallback: false,
        }
    }

    fn error(id: RpcId, error: RpcError) -> Self {
        Self::new(RpcMessage::error(id, error).to_value())
    }

    /// Queues the reply on `client`.
    ///
    /// If the negotiated encoder cannot encode it, a JSON-encoded
    /// InternalError with a null id is sent in its place.
    pub fn deliver(&self, client: &ClientHandle) -> bool {
        let sent = if self.json_fallback {
            client.send_with(&JsonEncoder, &self.packet)
        } else {
            client.send(&self.packet)
        };

        match sent {
            Ok(()) => true,
            Err(SendError::Encode(err)) => {
                tracing::warn!("Encoding reply for {} failed: {}", client.id(), err);
                let report = RpcMessage::error(
                    RpcId::Null,
                    RpcError::internal_error(None).with_note("encoding failed"),
                );
                if let Err(err) = client.send_with(&JsonEncoder, &report.to_value()) {
                    tracing::debug!("Dropping encode failure report for {}: {}", client.id(), err);
                }
                false
            }
            Err(err @ SendError::Disconnected(_)) => {
                tracing::debug!("Dropping reply: {}", err);
                false
            }
        }
    }
}

/// Turns inbound frames into handler calls and handler outcomes into replies.
///
/// Nothing in here fails: malformed input, unknown methods, handler errors and
/// handler panics all end up as error messages (for requests) or log lines
/// (for events).
pub struct RpcDispatcher<C> {
    rpc_handler: Option<RpcHandler<C>>,
    event_handler: Option<EventHandler<C>>,
    max_batch: usize,
}

impl<C> Default for RpcDispatcher<C> {
    fn default() -> Self {
        Self {
            rpc_handler: None,
            event_handler: None,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

impl<C: Send + Sync + 'static> RpcDispatcher<C> {
    pub fn new(max_batch: usize) -> Self {
        Self {
            max_batch,
            ..Self::default()
        }
    }

    pub fn set_rpc_handler<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Context<C>, String, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: RpcHandler<C> =
            Arc::new(move |ctx: Context<C>, method: String, args: Vec<Value>| {
                Box::pin(handler(ctx, method, args)) as BoxFuture<'static, HandlerResult>
            });
        self.rpc_handler = Some(handler);
    }

    pub fn set_event_handler<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Context<C>, String, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let handler: EventHandler<C> =
            Arc::new(move |ctx: Context<C>, method: String, args: Vec<Value>| {
                Box::pin(handler(ctx, method, args)) as BoxFuture<'static, Result<(), BoxError>>
            });
        self.event_handler = Some(handler);
    }

    /// Decodes one frame with the connection's encoder and dispatches it.
    pub async fn handle_frame(&self, scope: &DispatchScope<C>, bytes: &[u8]) -> Option<Reply> {
        let decoded = match scope.client.encoder().decode(bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!("Undecodable frame from {}: {}", scope.client.id(), err);
                let mut reply = Reply::error(
                    RpcId::Null,
                    RpcError::parse_error(None).with_note(format!("decoding failed: {err}")),
                );
                reply.json_fallback = true;
                return Some(reply);
            }
        };

        self.handle_value(scope, decoded).await
    }

    /// Dispatches an already decoded unit. Returns `None` when nothing has to
    /// be sent back (events only, suppressed requests, an empty batch).
    pub async fn handle_value(&self, scope: &DispatchScope<C>, decoded: Value) -> Option<Reply> {
        if !decoded.is_object() && !decoded.is_array() {
            return Some(Reply::error(
                RpcId::Null,
                RpcError::parse_error(None).with_note("invalid message"),
            ));
        }

        let packet = match RpcPacket::split(decoded, self.max_batch) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!("Rejecting batch from {}: {}", scope.client.id(), error);
                return Some(Reply::error(RpcId::Null, error));
            }
        };

        let is_batch = packet.is_batch();
        let items = packet.into_items();
        let answers = join_all(items.iter().map(|item| self.handle_item(scope, item))).await;

        let responses: Vec<Value> = answers
            .into_iter()
            .flatten()
            .map(|message| message.to_value())
            .collect();

        RpcPacket::from_items(is_batch, responses).map(|packet| Reply::new(packet.into()))
    }

    async fn handle_item(&self, scope: &DispatchScope<C>, raw: &Value) -> Option<RpcMessage> {
        let message = match parse_message(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("Invalid message from {}: {}", scope.client.id(), err.kind);
                return Some(err.into_message());
            }
        };

        match message {
            RpcMessage::Request { id, method, args } => self.invoke_rpc(scope, id, method, args).await,
            RpcMessage::Event { method, args } => {
                self.invoke_event(scope, method, args).await;
                None
            }
            RpcMessage::Response { id, .. } => Some(RpcMessage::error(
                id,
                RpcError::invalid_request(None)
                    .with_note("client must not send response message to server"),
            )),
            RpcMessage::Error { id, .. } => Some(RpcMessage::error(
                id,
                RpcError::invalid_request(None)
                    .with_note("client must not send error message to server"),
            )),
        }
    }

    async fn invoke_rpc(
        &self,
        scope: &DispatchScope<C>,
        id: RpcId,
        method: String,
        args: Vec<Value>,
    ) -> Option<RpcMessage> {
        let Some(handler) = &self.rpc_handler else {
            return Some(RpcMessage::error(
                id,
                RpcError::method_not_found(Some(Value::String(method))),
            ));
        };

        let ctx = scope.context(&method);
        let outcome = AssertUnwindSafe(handler(ctx, method.clone(), args))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(Answer::Value(result))) => Some(RpcMessage::response(id, result)),
            Ok(Ok(Answer::Suppressed)) => {
                tracing::debug!("Response to '{}' ({}) suppressed", method, id);
                None
            }
            Ok(Err(err)) => Some(RpcMessage::error(id, handler_error(&method, err.as_ref()))),
            Err(_) => {
                tracing::error!("Handler for '{}' panicked", method);
                Some(RpcMessage::error(id, RpcError::internal_error(None)))
            }
        }
    }

    async fn invoke_event(&self, scope: &DispatchScope<C>, method: String, args: Vec<Value>) {
        let Some(handler) = &self.event_handler else {
            tracing::trace!("No event handler, dropping '{}'", method);
            return;
        };

        let ctx = scope.context(&method);
        match AssertUnwindSafe(handler(ctx, method.clone(), args))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!("Event handler for '{}' failed: {}", method, err),
            Err(_) => tracing::warn!("Event handler for '{}' panicked", method),
        }
    }
}

/// Maps a request handler failure to the error object sent back.
fn handler_error(method: &str, err: &(dyn std::error::Error + Send + Sync + 'static)) -> RpcError {
    if let Some(error) = err.downcast_ref::<RpcError>() {
        return error.clone();
    }
    if let Some(thrown) = err.downcast_ref::<ThrownError>() {
        return thrown.to_rpc_error();
    }
    tracing::warn!("Handler for '{}' failed: {}", method, err);
    RpcError::internal_error(None)
}
