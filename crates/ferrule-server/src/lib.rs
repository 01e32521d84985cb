//! # Ferrule JSON-RPC Server
//!
//! Expose plain Rust objects as JSON-RPC 2.0 services over TCP.
//!
//! A service is an ordinary type whose callable methods are listed once, at
//! registration time, by [`RpcService::register`]. The `#[rpc_service]`
//! attribute writes that registration for you.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrule_server::prelude::*;
//! use thiserror::Error;
//!
//! #[derive(Debug, Error, RpcError)]
//! #[error("wrong pin")]
//! #[rpc_error(code = 1, message = "credential failure")]
//! struct CredentialError;
//!
//! struct Calculator;
//!
//! #[rpc_service(errors(CredentialError))]
//! impl Calculator {
//!     #[rpc_method]
//!     pub fn add(&self, a: i64, b: i64) -> i64 {
//!         a + b
//!     }
//!
//!     #[rpc_method]
//!     pub fn subtract(&self, a: i64, #[param(default = 1)] b: i64) -> i64 {
//!         a - b
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ferrule_server::Result<()> {
//!     let server = RpcServer::builder()
//!         .bind_address("127.0.0.1:8000".parse().unwrap())
//!         .service(Calculator)
//!         .build()?;
//!
//!     server.run().await
//! }
//! ```

extern crate self as ferrule_server;

pub mod binding;
pub mod builder;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
mod endpoint;
pub mod errors;
pub mod prelude;
pub mod server;
pub mod service;
pub mod transport;

// Re-export main types
pub use binding::{ArgumentError, Arguments, BindError, bind_arguments};
pub use builder::RpcServerBuilder;
pub use config::{ConnectionMode, ServerConfig, TransportConfig};
pub use descriptor::{
    BoundValue, DeclaredType, ExclusiveInvoker, InvokeResult, MethodDescriptor, MethodHandle,
    ParameterDescriptor, ServiceDescriptor, SharedInvoker,
};
pub use dispatcher::{DispatchOptions, Dispatcher};
pub use errors::{ErrorDescriptor, ErrorRegistry, RpcErrorKind, ServiceError};
pub use server::RpcServer;
pub use service::{RegistrationError, RpcService, ServiceRegistrar, register_service};
pub use transport::ConnectionError;

// Code generation
pub use ferrule_derive::{RpcError, param, rpc_method, rpc_service};

// Re-export foundational types
pub use ferrule_json_rpc;
pub use futures::future::BoxFuture;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, FerruleError>;

/// Server-level errors
#[derive(Debug, thiserror::Error)]
pub enum FerruleError {
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] ferrule_json_rpc::JsonRpcError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a method's return value as the `result` of a reply
pub fn to_result_value<T: serde::Serialize>(value: T) -> InvokeResult {
    serde_json::to_value(value).map_err(ServiceError::from)
}

#[cfg(test)]
mod tests;
