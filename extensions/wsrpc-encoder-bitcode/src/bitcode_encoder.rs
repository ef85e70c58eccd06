use crate::wire_packet::{WireError, WireMessage, WirePacket};
use crate::wire_value::{WireNode, WireValue};
use serde_json::{Map, Value};
use wsrpc::{DecodeError, EncodeError, FrameKind, RpcEncoder, integer_code};

/// Stands in for the empty method name, which the schema cannot tell apart
/// from an absent one.
pub const EMPTY_METHOD_SENTINEL: &str = "rpc.empty";

/// Compact binary encoder, negotiated as `rpc.bitcode`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitcodeEncoder;

impl BitcodeEncoder {
    pub const NAME: &'static str = "bitcode";
}

impl RpcEncoder for BitcodeEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn frame_kind(&self) -> FrameKind {
        FrameKind::Binary
    }

    fn encode(&self, packet: &Value) -> Result<Vec<u8>, EncodeError> {
        let (batch, items) = match packet {
            Value::Array(items) => (true, items.iter().collect::<Vec<_>>()),
            item => (false, vec![item]),
        };

        let messages = items
            .into_iter()
            .map(encode_message)
            .collect::<Result<Vec<_>, String>>()
            .map_err(|reason| EncodeError::new(Self::NAME, reason))?;

        Ok(bitcode::encode(&WirePacket { batch, messages }))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let packet: WirePacket =
            bitcode::decode(bytes).map_err(|err| DecodeError::new(Self::NAME, err))?;

        let mut messages = packet
            .messages
            .into_iter()
            .map(decode_message)
            .collect::<Result<Vec<_>, String>>()
            .map_err(|reason| DecodeError::new(Self::NAME, reason))?;

        if packet.batch {
            return Ok(Value::Array(messages));
        }
        match (messages.pop(), messages.is_empty()) {
            (Some(message), true) => Ok(message),
            _ => Err(DecodeError::new(
                Self::NAME,
                "non-batch packet must carry exactly one message",
            )),
        }
    }
}

fn encode_message(value: &Value) -> Result<WireMessage, String> {
    let Value::Object(object) = value else {
        return Err("message must be an object".into());
    };

    let mut message = WireMessage {
        jsonrpc: object
            .get("jsonrpc")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ..WireMessage::default()
    };

    if let Some(method) = object.get("method") {
        let method = method.as_str().ok_or("method must be a string")?;
        message.method = encode_method(method);
    }
    message.id = encode_field(object.get("id"))?;
    message.params = encode_field(object.get("params"))?;
    message.result = encode_field(object.get("result"))?;

    if let Some(error) = object.get("error") {
        let code = error
            .get("code")
            .and_then(integer_code)
            .ok_or("error code must be an integer")?;
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .ok_or("error message must be a string")?;
        message.error = Some(WireError {
            code,
            message: text.to_string(),
            data: encode_field(error.get("data"))?,
        });
    }

    Ok(message)
}

fn decode_message(message: WireMessage) -> Result<Value, String> {
    let mut object = Map::new();

    if !message.jsonrpc.is_empty() {
        object.insert("jsonrpc".into(), Value::String(message.jsonrpc));
    }
    if let Some(method) = decode_method(message.method) {
        object.insert("method".into(), Value::String(method));
    }
    insert_field(&mut object, "id", message.id)?;
    insert_field(&mut object, "params", message.params)?;
    insert_field(&mut object, "result", message.result)?;

    if let Some(error) = message.error {
        let mut fields = Map::new();
        fields.insert("code".into(), Value::from(error.code));
        fields.insert("message".into(), Value::String(error.message));
        insert_field(&mut fields, "data", error.data)?;
        object.insert("error".into(), Value::Object(fields));
    }

    Ok(Value::Object(object))
}

fn encode_method(method: &str) -> String {
    if method.is_empty() {
        EMPTY_METHOD_SENTINEL.to_string()
    } else {
        method.to_string()
    }
}

fn decode_method(method: String) -> Option<String> {
    match method.as_str() {
        "" => None,
        EMPTY_METHOD_SENTINEL => Some(String::new()),
        _ => Some(method),
    }
}

fn encode_field(value: Option<&Value>) -> Result<Vec<WireNode>, String> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => WireValue::from_json(value)
            .flatten()
            .map_err(|err| err.to_string()),
    }
}

fn insert_field(
    object: &mut Map<String, Value>,
    key: &str,
    nodes: Vec<WireNode>,
) -> Result<(), String> {
    if nodes.is_empty() {
        return Ok(());
    }
    let value = WireValue::unflatten(nodes).map_err(|err| err.to_string())?;
    object.insert(key.to_string(), value.into_json());
    Ok(())
}
