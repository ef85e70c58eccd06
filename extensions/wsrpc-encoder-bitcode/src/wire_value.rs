use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest container nesting accepted when rebuilding a value. Matches the
/// recursion limit `serde_json` applies to JSON input.
pub const MAX_DEPTH: usize = 128;

/// Dynamically typed value tree carried by the binary schema.
///
/// Integers and floats are kept apart so `1` and `1.0` survive a round trip
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(String),
    Array(Vec<WireValue>),
    Map(Vec<(String, WireValue)>),
}

/// One node of a flattened [`WireValue`].
///
/// Containers store their length and are followed by their children in
/// pre-order. Each map entry is a `Str` key node followed by the value's
/// nodes.
#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
pub enum WireNode {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Array(u32),
    Map(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireValueError {
    #[error("value tree ended unexpectedly")]
    Truncated,

    #[error("map key is not a string")]
    NonStringKey,

    #[error("trailing nodes after value")]
    TrailingNodes,

    #[error("container too large")]
    TooLarge,

    #[error("value nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

impl WireValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => WireValue::Null,
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    WireValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    WireValue::UInt(u)
                } else {
                    WireValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => WireValue::Str(s.clone()),
            Value::Array(items) => WireValue::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(fields) => WireValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back into a JSON value. Non-finite floats become `null`, as
    /// JSON cannot express them.
    pub fn into_json(self) -> Value {
        match self {
            WireValue::Null => Value::Null,
            WireValue::Bool(b) => Value::Bool(b),
            WireValue::Int(i) => Value::from(i),
            WireValue::UInt(u) => Value::from(u),
            WireValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            WireValue::Str(s) => Value::String(s),
            WireValue::Array(items) => {
                Value::Array(items.into_iter().map(WireValue::into_json).collect())
            }
            WireValue::Map(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    pub fn flatten(&self) -> Result<Vec<WireNode>, WireValueError> {
        let mut nodes = Vec::new();
        self.flatten_into(&mut nodes)?;
        Ok(nodes)
    }

    fn flatten_into(&self, nodes: &mut Vec<WireNode>) -> Result<(), WireValueError> {
        match self {
            WireValue::Null => nodes.push(WireNode::Null),
            WireValue::Bool(b) => nodes.push(WireNode::Bool(*b)),
            WireValue::Int(i) => nodes.push(WireNode::Int(*i)),
            WireValue::UInt(u) => nodes.push(WireNode::UInt(*u)),
            WireValue::Float(f) => nodes.push(WireNode::Float(*f)),
            WireValue::Str(s) => nodes.push(WireNode::Str(s.clone())),
            WireValue::Array(items) => {
                let len = u32::try_from(items.len()).map_err(|_| WireValueError::TooLarge)?;
                nodes.push(WireNode::Array(len));
                for item in items {
                    item.flatten_into(nodes)?;
                }
            }
            WireValue::Map(fields) => {
                let len = u32::try_from(fields.len()).map_err(|_| WireValueError::TooLarge)?;
                nodes.push(WireNode::Map(len));
                for (key, value) in fields {
                    nodes.push(WireNode::Str(key.clone()));
                    value.flatten_into(nodes)?;
                }
            }
        }
        Ok(())
    }

    /// Rebuilds a value from exactly one flattened tree.
    pub fn unflatten(nodes: Vec<WireNode>) -> Result<Self, WireValueError> {
        let mut nodes = nodes.into_iter();
        let value = Self::unflatten_from(&mut nodes, 0)?;
        if nodes.next().is_some() {
            return Err(WireValueError::TrailingNodes);
        }
        Ok(value)
    }

    fn unflatten_from<I>(nodes: &mut I, depth: usize) -> Result<Self, WireValueError>
    where
        I: Iterator<Item = WireNode>,
    {
        let node = nodes.next().ok_or(WireValueError::Truncated)?;
        if matches!(node, WireNode::Array(_) | WireNode::Map(_)) && depth >= MAX_DEPTH {
            return Err(WireValueError::TooDeep);
        }

        Ok(match node {
            WireNode::Null => WireValue::Null,
            WireNode::Bool(b) => WireValue::Bool(b),
            WireNode::Int(i) => WireValue::Int(i),
            WireNode::UInt(u) => WireValue::UInt(u),
            WireNode::Float(f) => WireValue::Float(f),
            WireNode::Str(s) => WireValue::Str(s),
            WireNode::Array(len) => {
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(Self::unflatten_from(nodes, depth + 1)?);
                }
                WireValue::Array(items)
            }
            WireNode::Map(len) => {
                let mut fields = Vec::new();
                for _ in 0..len {
                    let WireNode::Str(key) = nodes.next().ok_or(WireValueError::Truncated)? else {
                        return Err(WireValueError::NonStringKey);
                    };
                    fields.push((key, Self::unflatten_from(nodes, depth + 1)?));
                }
                WireValue::Map(fields)
            }
        })
    }
}
