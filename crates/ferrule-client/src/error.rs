//! Error types for client operations

use ferrule_json_rpc::{JsonRpcErrorObject, JsonRpcTransportError};
use serde_json::Value;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(JsonRpcTransportError),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation timed out")]
    Timeout,

    /// Server returned an error
    #[error("Server error (code {code}): {message}")]
    Server {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The reply did not match what was sent
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Check if the error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(JsonRpcTransportError::IoError(_)) => true,
            ClientError::Timeout => true,
            // Server errors in the -32099..=-32000 range are implementation defined
            ClientError::Server { code, .. } => (-32099..=-32000).contains(code),
            _ => false,
        }
    }

    /// Get error code if this is a server error
    pub fn error_code(&self) -> Option<i64> {
        match self {
            ClientError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol(message.into())
    }
}

impl From<JsonRpcTransportError> for ClientError {
    fn from(error: JsonRpcTransportError) -> Self {
        match error {
            JsonRpcTransportError::Timeout(_) => ClientError::Timeout,
            other => ClientError::Transport(other),
        }
    }
}

impl From<JsonRpcErrorObject> for ClientError {
    fn from(error: JsonRpcErrorObject) -> Self {
        ClientError::Server {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transport_timeout_becomes_timeout() {
        let error: ClientError = JsonRpcTransportError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(error, ClientError::Timeout));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_server_error_conversion() {
        let error: ClientError = JsonRpcErrorObject::application(1, "credential failure").into();
        assert_eq!(error.error_code(), Some(1));
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "Server error (code 1): credential failure");
    }
}
