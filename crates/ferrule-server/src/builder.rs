//! Builder for JSON-RPC servers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{ConnectionMode, ServerConfig};
use crate::dispatcher::Dispatcher;
use crate::server::RpcServer;
use crate::service::RpcService;
use crate::{FerruleError, Result};

/// Builder for [`RpcServer`].
///
/// Registration problems are collected and reported together by
/// [`build`](RpcServerBuilder::build).
pub struct RpcServerBuilder {
    config: ServerConfig,
    dispatcher: Dispatcher,
    /// Validation errors collected during registration
    validation_errors: Vec<String>,
}

impl RpcServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: Dispatcher::new(),
            validation_errors: Vec::new(),
        }
    }

    /// Mount a service at the root: its methods are called by bare name
    pub fn service<S: RpcService>(mut self, service: S) -> Self {
        if let Err(err) = self.dispatcher.register_service(service) {
            self.validation_errors
                .push(format!("{}: {}", std::any::type_name::<S>(), err));
        }
        self
    }

    /// Mount a service under `namespace`: its methods are called as `namespace.method`
    pub fn service_at<S: RpcService>(mut self, namespace: &str, service: S) -> Self {
        if let Err(err) = self.dispatcher.register_service_at(namespace, service) {
            self.validation_errors
                .push(format!("{} at `{}`: {}", std::any::type_name::<S>(), namespace, err));
        }
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.config.connection_mode = mode;
        self
    }

    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.config.max_request_bytes = limit;
        self
    }

    pub fn max_response_bytes(mut self, limit: usize) -> Self {
        self.config.max_response_bytes = limit;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn invoke_timeout(mut self, timeout: Duration) -> Self {
        self.config.invoke_timeout = timeout;
        self
    }

    /// Execute requests without an `id` but never answer them
    pub fn strict_notifications(mut self, strict: bool) -> Self {
        self.config.strict_notifications = strict;
        self
    }

    pub fn build(mut self) -> Result<RpcServer> {
        self.validation_errors.extend(self.config.validate());
        if self.dispatcher.service_count() == 0 {
            self.validation_errors
                .push("at least one service must be registered".to_string());
        }

        if !self.validation_errors.is_empty() {
            return Err(FerruleError::Config(self.validation_errors.join("\n")));
        }

        self.dispatcher.set_options(self.config.dispatch_options());
        debug!(
            services = self.dispatcher.service_count(),
            bind_address = %self.config.bind_address,
            "Built JSON-RPC server"
        );

        Ok(RpcServer::new(self.config, Arc::new(self.dispatcher)))
    }
}

impl Default for RpcServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
