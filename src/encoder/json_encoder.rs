use super::{DecodeError, EncodeError, FrameKind, RpcEncoder, SharedEncoder};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static JSON_ENCODER: Lazy<SharedEncoder> = Lazy::new(|| Arc::new(JsonEncoder));

/// Returns the process-wide JSON encoder instance.
///
/// Every registry contains it, and it is used to report failures that must
/// stay readable even when a binary codec was negotiated.
pub fn json_encoder() -> SharedEncoder {
    JSON_ENCODER.clone()
}

/// Human-readable encoder; frames are UTF-8 JSON sent as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl JsonEncoder {
    pub const NAME: &'static str = "json";
}

impl RpcEncoder for JsonEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn frame_kind(&self) -> FrameKind {
        FrameKind::Text
    }

    fn encode(&self, packet: &Value) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(packet).map_err(|err| EncodeError::new(Self::NAME, err))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        serde_json::from_slice(bytes).map_err(|err| DecodeError::new(Self::NAME, err))
    }
}
