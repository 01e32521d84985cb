//! Shared services and server harness for the integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use ferrule_server::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Error, RpcError)]
#[error("pin rejected")]
#[rpc_error(code = 1, message = "credential failure")]
pub struct CredentialError;

#[derive(Debug, Error)]
#[error("test throw")]
pub struct TestThrow;

pub struct SimpleAddService;

#[rpc_service(errors(CredentialError))]
impl SimpleAddService {
    #[rpc_method]
    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    #[rpc_method]
    pub fn subtract(&self, a: i64, #[param(default = 1)] b: i64) -> i64 {
        a - b
    }

    #[rpc_method]
    pub fn login(&self, pin: String) -> Result<String, CredentialError> {
        if pin == "1234" { Ok("welcome".to_string()) } else { Err(CredentialError) }
    }

    #[rpc_method]
    pub fn throws(&self) -> Result<i64, TestThrow> {
        Err(TestThrow)
    }

    #[rpc_method]
    pub fn echo(&self, text: String) -> String {
        text
    }

    #[rpc_method]
    pub async fn slow(&self, millis: u64) -> u64 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        millis
    }
}

#[derive(Default)]
pub struct Counter {
    value: i64,
    history: Vec<i64>,
}

#[rpc_service]
impl Counter {
    #[rpc_method]
    pub async fn increment(&mut self) -> i64 {
        let next = self.value + 1;
        tokio::task::yield_now().await;
        self.value = next;
        self.history.push(next);
        next
    }

    #[rpc_method]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[rpc_method]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A server serving on an ephemeral port until stopped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ferrule_server::Result<()>>,
}

impl TestServer {
    pub async fn start(builder: RpcServerBuilder) -> Self {
        init_logging();
        let server = builder.build().expect("server should build");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub async fn simple(mode: ConnectionMode) -> Self {
        Self::start(RpcServer::builder().service(SimpleAddService).connection_mode(mode)).await
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = tokio::time::timeout(Duration::from_secs(5), &mut self.handle)
            .await
            .expect("server should stop")
            .expect("server task should not panic");
        assert!(result.is_ok(), "server stopped with error: {:?}", result);
    }
}

/// Write raw bytes on a fresh connection and read until the server closes
pub async fn send_raw(addr: SocketAddr, bytes: &[u8], half_close: bool) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(bytes).await.expect("write");
    if half_close {
        stream.shutdown().await.expect("shutdown");
    }
    let mut reply = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut reply))
        .await
        .expect("server should close the connection")
        .expect("read");
    reply
}

/// [`send_raw`] for text requests with a JSON reply
pub async fn exchange(addr: SocketAddr, request: &str) -> Value {
    let reply = send_raw(addr, request.as_bytes(), false).await;
    serde_json::from_slice(&reply).expect("reply should be JSON")
}
