//! Binary encoder for `wsrpc`.
//!
//! Messages are mapped onto a fixed schema whose dynamic parts (ids, params,
//! results, error data) are stored as an explicit value tree, flattened into a
//! pre-order node list and serialized with `bitcode`. The encoder is offered
//! during negotiation as `rpc.bitcode`.

mod bitcode_encoder;
mod wire_packet;
mod wire_value;

pub use bitcode_encoder::{BitcodeEncoder, EMPTY_METHOD_SENTINEL};
pub use wire_value::{MAX_DEPTH, WireNode, WireValue, WireValueError};
