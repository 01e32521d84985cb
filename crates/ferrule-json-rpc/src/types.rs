use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier established by the caller of a JSON-RPC request.
///
/// A request without an `id` member is a notification and carries no
/// `RequestId` at all; a request with `"id": null` carries [`RequestId::Null`],
/// which is echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Salvage an id from a raw JSON value, e.g. when the rest of the request is malformed
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(RequestId::String(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(RequestId::Number),
            serde_json::Value::Null => Some(RequestId::Null),
            _ => None,
        }
    }
}

/// Deserialize a present `id` member, keeping `null` distinct from "absent".
///
/// Used together with `#[serde(default)]`: a missing member never reaches this
/// function and stays `None`.
pub(crate) fn deserialize_present_id<'de, D>(deserializer: D) -> Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    RequestId::deserialize(deserializer).map(Some)
}

/// JSON-RPC version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => "2.0",
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "2.0" => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::Number(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");
    }

    #[test]
    fn test_request_id_from_value() {
        assert_eq!(RequestId::from_value(&json!(7)), Some(RequestId::Number(7)));
        assert_eq!(
            RequestId::from_value(&json!("abc")),
            Some(RequestId::String("abc".to_string()))
        );
        assert_eq!(RequestId::from_value(&json!(null)), Some(RequestId::Null));
        assert_eq!(RequestId::from_value(&json!({"nested": true})), None);
        assert_eq!(RequestId::from_value(&json!(1.5)), None);
    }

    #[test]
    fn test_json_rpc_version() {
        let version = JsonRpcVersion::V2_0;
        assert_eq!(version.as_str(), "2.0");
        assert_eq!(serde_json::to_string(&version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_err());
    }
}
