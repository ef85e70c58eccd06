use crate::client_handle::ClientHandle;
use crate::client_registry::ClientRegistry;
use crate::handler::{BoxError, ThrownError};
use serde_json::Value;
use std::sync::Arc;
use wsrpc::RpcError;

/// Per-invocation view handed to request and event handlers.
///
/// `C` is the server-wide value supplied through
/// [`RpcServer::with_context`](crate::RpcServer::with_context); it is reached
/// through [`Context::global`] and never mixed with the fixed fields.
pub struct Context<C> {
    client: ClientHandle,
    clients: ClientRegistry,
    method: String,
    global: Arc<C>,
}

impl<C> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            clients: self.clients.clone(),
            method: self.method.clone(),
            global: self.global.clone(),
        }
    }
}

impl<C> Context<C> {
    pub(crate) fn new(
        client: ClientHandle,
        clients: ClientRegistry,
        method: impl Into<String>,
        global: Arc<C>,
    ) -> Self {
        Self {
            client,
            clients,
            method: method.into(),
            global,
        }
    }

    pub fn client_id(&self) -> &str {
        self.client.id()
    }

    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn global(&self) -> &C {
        &self.global
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Pushes an event to the calling client.
    pub async fn emit(&self, event: &str, args: Vec<Value>) -> bool {
        self.clients.emit_to(self.client.id(), event, args).await
    }

    pub async fn emit_to<S: AsRef<str>>(
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

    /// Fails the current request with an application error.
    ///
    /// ```ignore
    /// return ctx.throw(7, "denied", None);
    /// ```
    pub fn throw<T>(
        &self,
        code: impl Into<Value>,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Result<T, BoxError> {
        Err(Box::new(ThrownError::new(code, message, data)))
    }

    /// Fails the current request as if no handler knew its method.
    pub fn throw_method_not_found<T>(&self) -> Result<T, BoxError> {
        Err(Box::new(RpcError::method_not_found(Some(Value::String(
            self.method.clone(),
        )))))
    }
}
