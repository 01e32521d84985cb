//! JSON-RPC server over TCP

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use ferrule_json_rpc::{JsonRpcTransportError, TextChannel};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::Result;
use crate::builder::RpcServerBuilder;
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::transport;

/// A configured server: a dispatcher plus the transport settings to expose it with
#[derive(Clone)]
pub struct RpcServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl RpcServer {
    pub(crate) fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn builder() -> RpcServerBuilder {
        RpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Bind the configured address and serve until `signal` resolves
    pub async fn run_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener, signal).await
    }

    /// Serve on an already bound listener until `signal` resolves
    pub async fn serve<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!(
            "Starting JSON-RPC server with {} service(s)",
            self.dispatcher.service_count()
        );
        transport::serve(
            listener,
            Arc::clone(&self.dispatcher),
            self.config.transport(),
            signal,
        )
        .await?;
        info!("JSON-RPC server stopped");
        Ok(())
    }
}

/// In-process calls, without a socket
#[async_trait]
impl TextChannel for RpcServer {
    async fn exchange(&self, request: String) -> std::result::Result<Option<String>, JsonRpcTransportError> {
        self.dispatcher.exchange(request).await
    }
}
