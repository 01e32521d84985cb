use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatchOptions;

/// How a TCP connection carries payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// One payload in, one reply out, then the connection is closed
    #[default]
    OneShot,
    /// A persistent connection carrying one JSON text per line
    LineDelimited,
}

/// Configuration for the JSON-RPC TCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    pub connection_mode: ConnectionMode,
    /// Largest accepted payload (one-shot) or line (line-delimited)
    pub max_request_bytes: usize,
    /// Larger replies are replaced by an `Internal error`
    pub max_response_bytes: usize,
    /// How long a connection may stay silent before it is dropped
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub invoke_timeout: Duration,
    /// Suppress replies to requests without an `id`
    pub strict_notifications: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            connection_mode: ConnectionMode::OneShot,
            max_request_bytes: 64 * 1024,    // 64KB
            max_response_bytes: 1024 * 1024, // 1MB
            read_timeout: Duration::from_secs(10),
            invoke_timeout: Duration::from_secs(30),
            strict_notifications: false,
        }
    }
}

impl ServerConfig {
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            strict_notifications: self.strict_notifications,
            invoke_timeout: self.invoke_timeout,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            mode: self.connection_mode,
            max_request_bytes: self.max_request_bytes,
            max_response_bytes: self.max_response_bytes,
            read_timeout: self.read_timeout,
        }
    }

    /// Problems that make this configuration unusable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_request_bytes == 0 {
            errors.push("max_request_bytes must be greater than zero".to_string());
        }
        if self.max_response_bytes == 0 {
            errors.push("max_response_bytes must be greater than zero".to_string());
        }
        if self.read_timeout.is_zero() {
            errors.push("read_timeout must be greater than zero".to_string());
        }
        if self.invoke_timeout.is_zero() {
            errors.push("invoke_timeout must be greater than zero".to_string());
        }
        errors
    }
}

/// The per-connection slice of [`ServerConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub mode: ConnectionMode,
    pub max_request_bytes: usize,
    pub max_response_bytes: usize,
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        ServerConfig::default().transport()
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.connection_mode, ConnectionMode::OneShot);
        assert_eq!(config.max_request_bytes, 65536);
        assert!(config.validate().is_empty());
        assert!(!config.dispatch_options().strict_notifications);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: ServerConfig = serde_json::from_value(json!({
            "connection_mode": "line_delimited",
            "read_timeout": 2500
        }))
        .unwrap();

        assert_eq!(config.connection_mode, ConnectionMode::LineDelimited);
        assert_eq!(config.read_timeout, Duration::from_millis(2500));
        assert_eq!(config.invoke_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = ServerConfig {
            max_request_bytes: 0,
            invoke_timeout: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate().len(), 2);
    }
}
