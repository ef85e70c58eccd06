use crate::wire_value::WireNode;

/// Top-level binary frame.
///
/// `batch` records whether the unit was an array, so a single-element batch
/// and a lone message decode back to different shapes.
#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
pub(crate) struct WirePacket {
    pub batch: bool,
    pub messages: Vec<WireMessage>,
}

/// Fixed message schema. Empty strings and empty node lists mean "absent".
#[derive(Debug, Clone, PartialEq, Default, bitcode::Encode, bitcode::Decode)]
pub(crate) struct WireMessage {
    pub jsonrpc: String,
    pub id: Vec<WireNode>,
    pub method: String,
    pub params: Vec<WireNode>,
    pub result: Vec<WireNode>,
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
pub(crate) struct WireError {
    pub code: i64,
    pub message: String,
    pub data: Vec<WireNode>,
}
