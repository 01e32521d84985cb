//! # JSON-RPC 2.0 Message Model
//!
//! The wire-level shapes shared by the ferrule server and client: requests,
//! responses, protocol error objects and the payload parser that splits single
//! requests from batches. Nothing in this crate performs I/O or dispatch.
//!
//! ## Features
//! - Requests with optional `jsonrpc`/`id` members, so legacy callers that send
//!   only `{"method", "params"}` are still understood
//! - Tri-state request ids (absent, `null`, string/number)
//! - Batch payloads
//! - The fixed protocol error codes
//! - A [`TextChannel`] contract for "send text, receive text" transports

pub mod error;
pub mod message;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod channel;

pub mod prelude;

pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use message::{IncomingPayload, decode_request, parse_payload, parse_value};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use channel::TextChannel;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names starting with this prefix are reserved for protocol extensions
pub const RESERVED_METHOD_PREFIX: &str = "rpc.";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
