//! TCP transport: one accept loop, one task per connection

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ferrule_json_rpc::JsonRpcError;
use futures::{SinkExt, StreamExt};
use serde::de::IgnoredAny;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::config::{ConnectionMode, TransportConfig};
use crate::dispatcher::{Dispatcher, encode_error};

const READ_CHUNK: usize = 4096;

/// Failure of a single connection. Never affects the accept loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no complete request within {0:?}")]
    Timeout(Duration),

    #[error("codec error: {0}")]
    Codec(#[from] LinesCodecError),
}

/// Accept connections until `shutdown` resolves.
///
/// Connections already accepted keep running to completion.
pub async fn serve<F>(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: TransportConfig,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let local_addr = listener.local_addr()?;
    info!(%local_addr, mode = ?config.mode, "JSON-RPC server listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(%local_addr, "Shutting down accept loop");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    tokio::spawn(handle_connection(stream, peer, dispatcher, config));
                }
                Err(err) => {
                    error!("Failed to accept connection: {}", err);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: TransportConfig,
) {
    debug!("New connection from {}", peer);

    let result = match config.mode {
        ConnectionMode::OneShot => serve_one_shot(stream, &dispatcher, config).await,
        ConnectionMode::LineDelimited => serve_lines(stream, &dispatcher, config).await,
    };

    match result {
        Ok(()) => debug!("Connection from {} closed", peer),
        Err(ConnectionError::Timeout(limit)) => warn!("Connection from {} timed out after {:?}", peer, limit),
        Err(err) => error!("Error serving connection from {}: {}", peer, err),
    }
}

enum OneShotRead {
    Complete(Vec<u8>),
    TooLarge,
    Empty,
}

async fn serve_one_shot(
    mut stream: TcpStream,
    dispatcher: &Dispatcher,
    config: TransportConfig,
) -> Result<(), ConnectionError> {
    let read = timeout(config.read_timeout, read_one_shot(&mut stream, config.max_request_bytes))
        .await
        .map_err(|_| ConnectionError::Timeout(config.read_timeout))??;

    let reply = match read {
        OneShotRead::Complete(bytes) => dispatch_bytes(dispatcher, &bytes, config.max_response_bytes).await,
        OneShotRead::TooLarge => {
            warn!(limit = config.max_request_bytes, "Request exceeds size limit");
            Some(encode_error(JsonRpcError::invalid_request(None)))
        }
        OneShotRead::Empty => None,
    };

    if let Some(reply) = reply {
        stream.write_all(reply.as_bytes()).await?;
    }
    stream.shutdown().await?;
    Ok(())
}

/// Read until the bytes form one JSON text, the peer stops sending, or the
/// limit is exceeded
async fn read_one_shot(stream: &mut TcpStream, limit: usize) -> std::io::Result<OneShotRead> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            let payload = trim_padding(&buffer);
            return Ok(if payload.is_empty() {
                OneShotRead::Empty
            } else {
                OneShotRead::Complete(payload.to_vec())
            });
        }

        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > limit {
            return Ok(OneShotRead::TooLarge);
        }

        let payload = trim_padding(&buffer);
        if is_complete(payload) {
            return Ok(OneShotRead::Complete(payload.to_vec()));
        }
    }
}

/// Strip surrounding whitespace and the NUL padding fixed-size senders leave behind
fn trim_padding(bytes: &[u8]) -> &[u8] {
    let is_padding = |b: &u8| matches!(b, 0 | b' ' | b'\t' | b'\r' | b'\n');
    let start = bytes.iter().position(|b| !is_padding(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_padding(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// `false` only while more bytes could still turn this into valid JSON
fn is_complete(payload: &[u8]) -> bool {
    if payload.is_empty() {
        return false;
    }
    match serde_json::from_slice::<IgnoredAny>(payload) {
        Ok(_) => true,
        Err(err) => !err.is_eof(),
    }
}

async fn dispatch_bytes(dispatcher: &Dispatcher, bytes: &[u8], max_response_bytes: usize) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => dispatch_text(dispatcher, text, max_response_bytes).await,
        Err(_) => {
            warn!("Request is not valid UTF-8");
            Some(encode_error(JsonRpcError::parse_error()))
        }
    }
}

async fn dispatch_text(dispatcher: &Dispatcher, text: &str, max_response_bytes: usize) -> Option<String> {
    let reply = dispatcher.handle_text(text).await?;
    if reply.len() > max_response_bytes {
        warn!(size = reply.len(), limit = max_response_bytes, "Reply exceeds size limit");
        return Some(encode_error(JsonRpcError::internal_error(None)));
    }
    Some(reply)
}

async fn serve_lines(stream: TcpStream, dispatcher: &Dispatcher, config: TransportConfig) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(config.max_request_bytes));

    loop {
        let next = match timeout(config.read_timeout, framed.next()).await {
            Ok(next) => next,
            Err(_) => {
                debug!("Idle connection reached read timeout");
                return Ok(());
            }
        };

        match next {
            None => return Ok(()),
            Some(Ok(line)) => {
                let line = line.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                if line.is_empty() {
                    continue;
                }
                if let Some(reply) = dispatch_text(dispatcher, line, config.max_response_bytes).await {
                    framed.send(reply).await?;
                }
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(limit = config.max_request_bytes, "Request line exceeds size limit");
                framed.send(encode_error(JsonRpcError::invalid_request(None))).await?;
                return Ok(());
            }
            Some(Err(LinesCodecError::Io(err))) if err.kind() == std::io::ErrorKind::InvalidData => {
                warn!("Request line is not valid UTF-8");
                framed.send(encode_error(JsonRpcError::parse_error())).await?;
                return Ok(());
            }
            Some(Err(err)) => return Err(err.into()),
        }
    }
}
