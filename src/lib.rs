//! Core protocol types for a bidirectional JSON-RPC 2.0 style protocol carried
//! over WebSockets.
//!
//! This crate is transport-agnostic. It defines the wire message model and its
//! validation rules, batching, the error vocabulary, the pluggable encoder
//! contract (with the mandatory JSON encoder), subprotocol negotiation helpers
//! and a small publish/subscribe event emitter. The Tokio client and server
//! live in the `extensions` crates.

pub mod constants;
pub mod encoder;
pub mod events;
pub mod proto;

pub use encoder::{
    DecodeError, EncodeError, EncoderRegistry, FrameKind, JsonEncoder, RpcEncoder,
    SharedEncoder, UnknownEncoderError, encoder_name, json_encoder, parse_protocol_header, protocol_token,
};
pub use events::{EventEmitter, Subscription};
pub use proto::{
    MessageParseError, MessageParseErrorKind, RpcError, RpcErrorCode, RpcId, RpcMessage,
    RpcMessageType, RpcPacket, args_from_params, integer_code, parse_message, params_from_args,
};
