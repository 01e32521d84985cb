use serde_json::Value;

use crate::{error::JsonRpcError, request::JsonRpcRequest, types::RequestId};

/// Top-level shape of an incoming payload
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingPayload {
    /// A single request object (not yet decoded)
    Single(Value),
    /// A non-empty batch of raw elements, each decoded independently
    Batch(Vec<Value>),
}

impl IncomingPayload {
    pub fn is_batch(&self) -> bool {
        matches!(self, IncomingPayload::Batch(_))
    }
}

/// Parse raw text into a single request or a batch.
///
/// Unparsable text is a parse error. A top level that is neither an object nor
/// a non-empty array is an invalid request.
pub fn parse_payload(text: &str) -> Result<IncomingPayload, JsonRpcError> {
    let value: Value = serde_json::from_str(text).map_err(|_| JsonRpcError::parse_error())?;
    parse_value(value)
}

/// Same as [`parse_payload`] for an already parsed JSON value
pub fn parse_value(value: Value) -> Result<IncomingPayload, JsonRpcError> {
    match value {
        Value::Object(_) => Ok(IncomingPayload::Single(value)),
        Value::Array(elements) if elements.is_empty() => Err(JsonRpcError::invalid_request(None)),
        Value::Array(elements) => Ok(IncomingPayload::Batch(elements)),
        _ => Err(JsonRpcError::invalid_request(None)),
    }
}

/// Decode one request object.
///
/// On failure the returned error echoes the request `id` when it can be
/// recovered from the raw object.
pub fn decode_request(value: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    let salvaged_id = match &value {
        Value::Object(obj) => obj.get("id").and_then(RequestId::from_value),
        _ => return Err(JsonRpcError::invalid_request(None)),
    };

    serde_json::from_value::<JsonRpcRequest>(value).map_err(|_| JsonRpcError::invalid_request(salvaged_id))
}
