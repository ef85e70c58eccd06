use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("<{encoder} encoder> {reason}")]
pub struct EncodeError {
    pub encoder: String,
    pub reason: String,
}

impl EncodeError {
    pub fn new(encoder: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            encoder: encoder.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("<{encoder} decoder> {reason}")]
pub struct DecodeError {
    pub encoder: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(encoder: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            encoder: encoder.into(),
            reason: reason.to_string(),
        }
    }
}

/// The peer selected a subprotocol naming an encoder that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid protocol '{protocol}' received from server")]
pub struct UnknownEncoderError {
    pub protocol: String,
}
