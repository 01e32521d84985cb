use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RESERVED_METHOD_PREFIX;
use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId, deserialize_present_id};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Get a parameter by name (object params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    /// Convert to a serde_json::Value for serialization
    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }

    /// Build params from an arbitrary JSON value.
    ///
    /// Returns `Ok(None)` for `null`, and gives the value back for anything that
    /// is neither an object nor an array.
    pub fn from_value(value: Value) -> Result<Option<Self>, Value> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(RequestParams::Object(map))),
            Value::Array(vec) => Ok(Some(RequestParams::Array(vec))),
            other => Err(other),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A JSON-RPC request or notification.
///
/// `jsonrpc` may be omitted on input and defaults to 2.0; `id` is absent for
/// notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc", default)]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
    #[serde(
        default,
        deserialize_with = "deserialize_present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method: method.into(),
            params,
            id,
        }
    }

    /// Create a request that expects a correlated reply
    pub fn call(id: RequestId, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self::new(Some(id), method, params)
    }

    /// Create a notification (no `id`, no reply expected)
    pub fn notification(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self::new(None, method, params)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }

    /// Reject method names the protocol reserves for itself
    pub fn validate(&self) -> Result<(), JsonRpcError> {
        if self.method.starts_with(RESERVED_METHOD_PREFIX) {
            return Err(JsonRpcError::invalid_request(self.id.clone()));
        }
        Ok(())
    }
}
