use serde_json::Value;
use wsrpc::events::{CONNECTED, DISCONNECTED, ERROR, MESSAGE};

/// Connection-level notifications, delivered under the `rpc.*` names.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Connected,
    Disconnected { code: Option<u16>, reason: String },
    /// A decoded inbound unit, before it is dispatched.
    Message(Value),
    /// A problem not tied to a specific call.
    Error(String),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Connected => CONNECTED,
            LifecycleEvent::Disconnected { .. } => DISCONNECTED,
            LifecycleEvent::Message(_) => MESSAGE,
            LifecycleEvent::Error(_) => ERROR,
        }
    }
}
