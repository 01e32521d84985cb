//! # JSON-RPC Prelude
//!
//! ```rust
//! use ferrule_json_rpc::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use crate::message::{IncomingPayload, decode_request, parse_payload};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use crate::channel::TextChannel;

// Standard error codes
pub use crate::error_codes::*;
