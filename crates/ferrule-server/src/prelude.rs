//! # Ferrule Server Prelude
//!
//! ```rust
//! use ferrule_server::prelude::*;
//! ```

pub use crate::{
    ConnectionMode, Dispatcher, ErrorDescriptor, RpcErrorKind, RpcServer, RpcServerBuilder, RpcService,
    ServerConfig, ServiceError, ServiceRegistrar,
};

// Code generation
pub use crate::{RpcError, param, rpc_method, rpc_service};

pub use ferrule_json_rpc::prelude::*;
