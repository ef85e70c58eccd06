use super::{RpcError, RpcMessage};
use serde_json::Value;

/// A transmitted unit: one item, or a batch of items sent as one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcPacket<T> {
    Single(T),
    Batch(Vec<T>),
}

impl RpcPacket<Value> {
    /// Wraps a decoded frame. Arrays become batches, anything else a single
    /// item.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => RpcPacket::Batch(items),
            item => RpcPacket::Single(item),
        }
    }

    /// Like [`RpcPacket::from_value`], but rejects a batch larger than
    /// `max_batch` before any of its items is looked at.
    pub fn split(value: Value, max_batch: usize) -> Result<Self, RpcError> {
        let packet = Self::from_value(value);
        if packet.len() > max_batch {
            return Err(RpcError::invalid_request(None)
                .with_note(format!("batch is too large size={max_batch}")));
        }
        Ok(packet)
    }
}

impl<T> RpcPacket<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, RpcPacket::Batch(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RpcPacket::Single(_) => 1,
            RpcPacket::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            RpcPacket::Single(item) => vec![item],
            RpcPacket::Batch(items) => items,
        }
    }

    /// Rebuilds a unit with the same shape as the one it answers.
    ///
    /// Returns `None` when there is nothing to send.
    pub fn from_items(is_batch: bool, mut items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        if is_batch {
            Some(RpcPacket::Batch(items))
        } else {
            items.truncate(1);
            items.pop().map(RpcPacket::Single)
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> RpcPacket<U> {
        match self {
            RpcPacket::Single(item) => RpcPacket::Single(f(item)),
            RpcPacket::Batch(items) => RpcPacket::Batch(items.into_iter().map(f).collect()),
        }
    }
}

impl From<RpcPacket<Value>> for Value {
    fn from(packet: RpcPacket<Value>) -> Self {
        match packet {
            RpcPacket::Single(item) => item,
            RpcPacket::Batch(items) => Value::Array(items),
        }
    }
}

impl From<RpcPacket<RpcMessage>> for Value {
    fn from(packet: RpcPacket<RpcMessage>) -> Self {
        packet.map(|message| message.to_value()).into()
    }
}

impl From<RpcMessage> for RpcPacket<RpcMessage> {
    fn from(message: RpcMessage) -> Self {
        RpcPacket::Single(message)
    }
}
