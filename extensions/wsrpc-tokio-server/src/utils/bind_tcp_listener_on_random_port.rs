use crate::constants::WS_ROUTE;
use std::io::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Binds a `TcpListener` to an OS-assigned port on `127.0.0.1` and returns it
/// together with the address it ended up on.
pub async fn bind_tcp_listener_on_random_port() -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    Ok((listener, address))
}

/// The WebSocket URL a client uses to reach a server listening on `address`.
pub fn ws_url(address: SocketAddr) -> String {
    format!("ws://{address}{WS_ROUTE}")
}
