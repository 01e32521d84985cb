//! Configuration types for the client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout configurations
    pub timeouts: TimeoutConfig,

    /// Largest reply accepted from the server
    pub max_response_bytes: usize,

    /// The server does not answer requests without an `id`; persistent
    /// channels then stop waiting for a reply to notification-only payloads
    pub strict_notifications: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            max_response_bytes: 1024 * 1024, // 1MB
            strict_notifications: false,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection timeout
    #[serde(with = "duration_serde")]
    pub connect: Duration,

    /// Request timeout for individual exchanges
    #[serde(with = "duration_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
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

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ClientConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.timeouts.connect, deserialized.timeouts.connect);
        assert_eq!(config.timeouts.request, deserialized.timeouts.request);
        assert_eq!(config.max_response_bytes, deserialized.max_response_bytes);
    }

    #[test]
    fn test_partial_config() {
        let config: ClientConfig = serde_json::from_str(r#"{"timeouts": {"request": 250}}"#).unwrap();
        assert_eq!(config.timeouts.request, Duration::from_millis(250));
        assert_eq!(config.timeouts.connect, Duration::from_secs(10));
    }
}
