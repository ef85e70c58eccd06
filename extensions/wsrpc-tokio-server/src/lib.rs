mod client_handle;
mod client_registry;
pub mod constants;
mod context;
mod handler;
mod rpc_dispatcher;
mod rpc_server;
mod server_config;
pub mod utils;

pub use client_handle::{ClientHandle, OutboundFrame, SendError};
pub use client_registry::ClientRegistry;
pub use context::Context;
pub use handler::{Answer, BoxError, EventHandler, HandlerResult, RpcHandler, ThrownError};
pub use rpc_dispatcher::{DispatchScope, Reply, RpcDispatcher};
pub use rpc_server::RpcServer;
pub use server_config::ServerConfig;
