use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Classification of a parsed message.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum RpcMessageType {
    Request = 1,
    Response = 2,
    Event = 3,
    Error = 4,
}
