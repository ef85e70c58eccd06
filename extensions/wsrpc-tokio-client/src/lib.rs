mod backoff;
mod call_error;
mod client_config;
mod connection;
pub mod constants;
mod lifecycle;
mod pending_calls;
mod readiness_gate;
mod rpc_client;

pub use backoff::{Backoff, ReconnectPolicy};
pub use call_error::RpcCallError;
pub use client_config::{ClientConfig, ReconnectConfig};
pub use connection::ConnectionState;
pub use lifecycle::LifecycleEvent;
pub use pending_calls::PendingCalls;
pub use rpc_client::RpcClient;
