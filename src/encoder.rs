mod encoder_error;
mod encoder_registry;
mod encoder_trait;
mod json_encoder;

pub use encoder_error::{DecodeError, EncodeError, UnknownEncoderError};
pub use encoder_registry::{EncoderRegistry, encoder_name, parse_protocol_header, protocol_token};
pub use encoder_trait::{FrameKind, RpcEncoder, SharedEncoder};
pub use json_encoder::{JsonEncoder, json_encoder};
