use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
///
/// `id` is omitted when the request carried none (legacy callers that never
/// send one still get their result).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    #[serde(
        default,
        deserialize_with = "crate::types::deserialize_present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn new(id: Option<RequestId>, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }

    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self::new(id, result)
    }

    pub fn null(id: Option<RequestId>) -> Self {
        Self::new(id, Value::Null)
    }
}

/// Union type that represents either a successful response or an error response.
/// Exactly one of `result`/`error` ends up on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    /// Create an error message
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self::Error(JsonRpcError::new(id, error))
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.as_ref(),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    /// The error object, if this is an error response
    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }

    /// Split into the result value or the error object
    pub fn into_result(self) -> Result<Value, JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(resp) => Ok(resp.result),
            JsonRpcMessage::Error(err) => Err(err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// Everything a server sends back for one incoming payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcReply {
    /// Serialize to the wire text
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, JsonRpcReply::Batch(_))
    }

    /// The messages contained in this reply, in order
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            JsonRpcReply::Single(message) => std::slice::from_ref(message),
            JsonRpcReply::Batch(messages) => messages,
        }
    }
}

impl From<JsonRpcMessage> for JsonRpcReply {
    fn from(message: JsonRpcMessage) -> Self {
        Self::Single(message)
    }
}
