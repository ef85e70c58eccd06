mod bind_tcp_listener_on_random_port;
mod generate_client_id;

pub use bind_tcp_listener_on_random_port::*;
pub use generate_client_id::*;
