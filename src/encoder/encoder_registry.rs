use super::{JsonEncoder, SharedEncoder, UnknownEncoderError, json_encoder};
use crate::constants::RPC_PREFIX;

/// Builds the subprotocol token advertising an encoder.
pub fn protocol_token(encoder_name: &str) -> String {
    format!("{RPC_PREFIX}{encoder_name}")
}

/// Extracts the encoder name from an `rpc.<name>` token.
///
/// Tokens outside the protocol namespace yield `None`.
pub fn encoder_name(token: &str) -> Option<&str> {
    token.strip_prefix(RPC_PREFIX)
}

/// Splits a `Sec-WebSocket-Protocol` header value into trimmed tokens.
pub fn parse_protocol_header(header: &str) -> Vec<&str> {
    header
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// The set of encoders one side is willing to speak, in preference order.
///
/// The JSON encoder is always present and always last, so it acts as the
/// fallback when nothing better is shared.
#[derive(Debug, Clone)]
pub struct EncoderRegistry {
    encoders: Vec<SharedEncoder>,
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self {
            encoders: vec![json_encoder()],
        }
    }

    pub fn with_encoders<I>(encoders: I) -> Self
    where
        I: IntoIterator<Item = SharedEncoder>,
    {
        let mut registry = Self::new();
        for encoder in encoders {
            registry.register(encoder);
        }
        registry
    }

    /// Adds an encoder ahead of the JSON fallback. An encoder with the same
    /// name replaces the previous one in place.
    pub fn register(&mut self, encoder: SharedEncoder) {
        if let Some(slot) = self
            .encoders
            .iter_mut()
            .find(|existing| existing.name() == encoder.name())
        {
            *slot = encoder;
            return;
        }
        let fallback_position = self.encoders.len() - 1;
        self.encoders.insert(fallback_position, encoder);
    }

    pub fn get(&self, name: &str) -> Option<SharedEncoder> {
        self.encoders
            .iter()
            .find(|encoder| encoder.name() == name)
            .cloned()
    }

    pub fn json(&self) -> SharedEncoder {
        self.get(JsonEncoder::NAME).unwrap_or_else(json_encoder)
    }

    pub fn names(&self) -> Vec<&str> {
        self.encoders.iter().map(|encoder| encoder.name()).collect()
    }

    /// Subprotocol tokens to offer when connecting, most preferred first.
    pub fn protocols(&self) -> Vec<String> {
        self.encoders
            .iter()
            .map(|encoder| protocol_token(encoder.name()))
            .collect()
    }

    /// Picks the first offered token (in the offering side's order) that
    /// names a registered encoder.
    pub fn negotiate<'a, I>(&self, offered: I) -> Option<SharedEncoder>
    where
        I: IntoIterator<Item = &'a str>,
    {
        offered
            .into_iter()
            .filter_map(encoder_name)
            .find_map(|name| self.get(name))
    }

    /// Resolves the encoder for the subprotocol the server agreed to.
    ///
    /// No token, or a token outside the protocol namespace, means JSON. A
    /// namespaced token naming an unknown encoder is an error.
    pub fn from_protocol(&self, protocol: Option<&str>) -> Result<SharedEncoder, UnknownEncoderError> {
        let Some(name) = protocol.and_then(encoder_name) else {
            return Ok(self.json());
        };
        self.get(name).ok_or_else(|| UnknownEncoderError {
            protocol: protocol.unwrap_or_default().to_string(),
        })
    }
}
