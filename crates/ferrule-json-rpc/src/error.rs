use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Map a raw code back to a protocol code, if it is one
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(JsonRpcErrorCode::ParseError),
            -32600 => Some(JsonRpcErrorCode::InvalidRequest),
            -32601 => Some(JsonRpcErrorCode::MethodNotFound),
            -32602 => Some(JsonRpcErrorCode::InvalidParams),
            -32603 => Some(JsonRpcErrorCode::InternalError),
            -32099..=-32000 => Some(JsonRpcErrorCode::ServerError(code)),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    /// An error object with an application-defined code
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, None)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found() -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, None, None)
    }

    /// Invalid params with a short reason attached as `data`
    pub fn invalid_params(reason: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            None,
            Some(Value::String(reason.to_string())),
        )
    }

    pub fn internal_error() -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None, None)
    }

    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        assert!(
            (-32099..=-32000).contains(&code),
            "Server error code must be in range -32099 to -32000"
        );
        Self::new(
            JsonRpcErrorCode::ServerError(code),
            Some(message.to_string()),
            data,
        )
    }

    /// The protocol code this object carries, if it is not application-defined
    pub fn protocol_code(&self) -> Option<JsonRpcErrorCode> {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// JSON-RPC Error response
///
/// Unlike a success response, `id` is always serialized: it is `null` when the
/// request id could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(None))
    }

    pub fn method_not_found(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found())
    }

    pub fn invalid_params(id: Option<RequestId>, reason: &str) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_params(reason))
    }

    pub fn internal_error(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error())
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Transport-level errors for moving JSON-RPC text around (no dispatch logic)
#[derive(Debug, Error)]
pub enum JsonRpcTransportError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        assert_eq!(
            JsonRpcErrorCode::from_code(-32005),
            Some(JsonRpcErrorCode::ServerError(-32005))
        );
        assert_eq!(JsonRpcErrorCode::from_code(1), None);
    }

    #[test]
    fn test_error_serialization() {
        let error = JsonRpcError::method_not_found(Some(RequestId::Number(1)));
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": 1
            })
        );
    }

    #[test]
    fn test_unknown_id_serializes_as_null() {
        let value = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert_eq!(value["id"], json!(null));
        assert_eq!(value["error"]["message"], "Parse error");
        assert!(value["error"].get("data").is_none());
    }

    #[test]
    fn test_invalid_params_carries_reason() {
        let error = JsonRpcErrorObject::invalid_params("missing required parameter `a`");
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Invalid params");
        assert_eq!(error.data, Some(json!("missing required parameter `a`")));
    }

    #[test]
    #[should_panic(expected = "Server error code must be in range")]
    fn test_server_error_range_enforced() {
        let _ = JsonRpcErrorObject::server_error(-1, "nope", None);
    }
}
