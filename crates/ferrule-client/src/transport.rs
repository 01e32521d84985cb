//! TCP channels matching the two server connection modes

use async_trait::async_trait;
use ferrule_json_rpc::{JsonRpcTransportError, TextChannel, decode_request};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::config::ClientConfig;

async fn connect(address: &str, config: &ClientConfig) -> Result<TcpStream, JsonRpcTransportError> {
    let limit = config.timeouts.connect;
    let stream = timeout(limit, TcpStream::connect(address))
        .await
        .map_err(|_| JsonRpcTransportError::Timeout(limit))??;
    debug!("Connected to {}", address);
    Ok(stream)
}

/// One connection per exchange: write the payload, half-close, read the reply
/// until the server closes.
#[derive(Debug, Clone)]
pub struct TcpChannel {
    address: String,
    config: ClientConfig,
}

impl TcpChannel {
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, ClientConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn exchange_once(&self, request: &str) -> Result<Option<String>, JsonRpcTransportError> {
        let mut stream = connect(&self.address, &self.config).await?;
        stream.write_all(request.as_bytes()).await?;
        stream.shutdown().await?;

        let limit = self.config.max_response_bytes;
        let mut buffer = Vec::new();
        (&mut stream).take(limit as u64 + 1).read_to_end(&mut buffer).await?;
        if buffer.len() > limit {
            return Err(JsonRpcTransportError::MessageTooLarge {
                size: buffer.len(),
                limit,
            });
        }
        if buffer.is_empty() {
            return Ok(None);
        }

        String::from_utf8(buffer)
            .map(Some)
            .map_err(|_| JsonRpcTransportError::ProtocolError("reply is not valid UTF-8".to_string()))
    }
}

#[async_trait]
impl TextChannel for TcpChannel {
    async fn exchange(&self, request: String) -> Result<Option<String>, JsonRpcTransportError> {
        let limit = self.config.timeouts.request;
        timeout(limit, self.exchange_once(&request))
            .await
            .map_err(|_| JsonRpcTransportError::Timeout(limit))?
    }
}

/// A persistent connection carrying one JSON text per line.
///
/// Exchanges are serialized over the single connection. The connection is
/// opened lazily and reopened after any failure.
pub struct LineChannel {
    address: String,
    config: ClientConfig,
    connection: Mutex<Option<Framed<TcpStream, LinesCodec>>>,
}

impl LineChannel {
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, ClientConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            address: address.into(),
            config,
            connection: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Drop the current connection, if any
    pub async fn disconnect(&self) {
        self.connection.lock().await.take();
    }

    /// Whether the server is expected to answer this payload at all
    fn expects_reply(&self, request: &str) -> bool {
        if !self.config.strict_notifications {
            return true;
        }
        // Only well-formed notifications go unanswered; anything the server
        // cannot decode is answered with an error
        let answered = |value: &Value| match decode_request(value.clone()) {
            Ok(request) => !request.is_notification(),
            Err(_) => true,
        };
        match serde_json::from_str::<Value>(request) {
            Ok(Value::Array(items)) => items.is_empty() || items.iter().any(answered),
            Ok(value) => answered(&value),
            _ => true,
        }
    }

    async fn exchange_locked(
        &self,
        framed: &mut Framed<TcpStream, LinesCodec>,
        request: String,
        expects_reply: bool,
    ) -> Result<Option<String>, JsonRpcTransportError> {
        framed.send(request).await.map_err(codec_error)?;
        if !expects_reply {
            return Ok(None);
        }

        match framed.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(err)) => Err(codec_error(err)),
            None => Err(JsonRpcTransportError::ProtocolError(
                "connection closed before a reply arrived".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for LineChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineChannel")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextChannel for LineChannel {
    async fn exchange(&self, request: String) -> Result<Option<String>, JsonRpcTransportError> {
        if request.contains('\n') {
            return Err(JsonRpcTransportError::ProtocolError(
                "line-delimited payloads cannot contain newlines".to_string(),
            ));
        }
        let expects_reply = self.expects_reply(&request);

        let mut guard = self.connection.lock().await;
        let mut framed = match guard.take() {
            Some(framed) => framed,
            None => {
                let stream = connect(&self.address, &self.config).await?;
                Framed::new(stream, LinesCodec::new_with_max_length(self.config.max_response_bytes))
            }
        };

        let limit = self.config.timeouts.request;
        let result = match timeout(limit, self.exchange_locked(&mut framed, request, expects_reply)).await {
            Ok(result) => result,
            Err(_) => Err(JsonRpcTransportError::Timeout(limit)),
        };

        match &result {
            Ok(_) => *guard = Some(framed),
            // A late reply would be read as the answer to the next request
            Err(err) => warn!("Dropping connection to {}: {}", self.address, err),
        }
        result
    }
}

fn codec_error(err: LinesCodecError) -> JsonRpcTransportError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => JsonRpcTransportError::ProtocolError(
            "reply line exceeds the configured size limit".to_string(),
        ),
        LinesCodecError::Io(err) => JsonRpcTransportError::IoError(err),
    }
}
