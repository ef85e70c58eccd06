mod rpc_batch;
mod rpc_error;
mod rpc_error_code;
mod rpc_id;
mod rpc_message;
mod rpc_message_type;
mod rpc_parse;

pub use rpc_batch::RpcPacket;
pub use rpc_error::{RpcError, integer_code};
pub use rpc_error_code::RpcErrorCode;
pub use rpc_id::RpcId;
pub use rpc_message::{RpcMessage, args_from_params, params_from_args};
pub use rpc_message_type::RpcMessageType;
pub use rpc_parse::{MessageParseError, MessageParseErrorKind, parse_message};
