use crate::client_handle::ClientHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use wsrpc::RpcMessage;

/// The live-clients table, keyed by client id.
///
/// Entries are added on accept and removed when the connection ends or is
/// evicted by the liveness sweep. Sends addressed to an id that is no longer
/// present report `false` instead of failing.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, ClientHandle>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, client: ClientHandle) {
        self.clients
            .write()
            .await
            .insert(client.id().to_string(), client);
    }

    pub async fn remove(&self, client_id: &str) -> Option<ClientHandle> {
        self.clients.write().await.remove(client_id)
    }

    pub async fn get(&self, client_id: &str) -> Option<ClientHandle> {
        self.clients.read().await.get(client_id).cloned()
    }

    pub async fn contains(&self, client_id: &str) -> bool {
        self.clients.read().await.contains_key(client_id)
    }

    pub async fn ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Sends `event` to each listed client and reports, per target, whether
    /// the frame was handed to a live connection.
    pub async fn emit<S: AsRef<str>>(
        &self,
        client_ids: &[S],
        event: &str,
        args: Vec<Value>,
    ) -> Vec<bool> {
        let packet = RpcMessage::event(event, args).to_value();
        let clients = self.clients.read().await;
        client_ids
            .iter()
            .map(|client_id| {
                let Some(client) = clients.get(client_id.as_ref()) else {
                    tracing::debug!("emit '{}' skipped unknown client {}", event, client_id.as_ref());
                    return false;
                };
                match client.send(&packet) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!("emit '{}' to {} failed: {}", event, client.id(), err);
                        false
                    }
                }
            })
            .collect()
    }

    pub async fn emit_to(&self, client_id: &str, event: &str, args: Vec<Value>) -> bool {
        self.emit(&[client_id], event, args)
            .await
            .first()
            .copied()
            .unwrap_or(false)
    }

    pub async fn emit_all(&self, event: &str, args: Vec<Value>) -> Vec<bool> {
        let ids = self.ids().await;
        self.emit(ids.as_slice(), event, args).await
    }

    /// Runs one liveness cycle.
    ///
    /// A client that has not answered the previous ping is terminated and
    /// removed; every other client has its flag cleared and is pinged again.
    /// Returns the ids that were evicted.
    pub async fn sweep(&self) -> Vec<String> {
        let snapshot: Vec<ClientHandle> = self.clients.read().await.values().cloned().collect();
        let mut evicted = Vec::new();

        for client in snapshot {
            if client.take_alive() {
                if !client.ping() {
                    tracing::trace!("ping to {} dropped, sender already closed", client.id());
                }
                continue;
            }

            tracing::warn!("Client {} missed its ping. Terminating connection.", client.id());
            client.terminate();
            // The connection may have gone away on its own since the snapshot.
            if self.remove(client.id()).await.is_some() {
                evicted.push(client.id().to_string());
            }
        }

        evicted
    }
}
