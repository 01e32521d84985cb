//! # ferrule-client
//!
//! Client side of the ferrule JSON-RPC runtime. A [`JsonRpcClient`] talks to
//! any [`TextChannel`]: the TCP channels in [`transport`] for remote servers,
//! or a `ferrule_server::RpcServer` directly for in-process use.
//!
//! ```rust,no_run
//! use ferrule_client::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> ClientResult<()> {
//! let client = JsonRpcClient::new(TcpChannel::new("127.0.0.1:8000"));
//! let sum: i64 = client.call("add", json!({"a": 1, "b": 2})).await?;
//! assert_eq!(sum, 3);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod transport;

pub use client::{BatchRequest, JsonRpcClient};
pub use config::{ClientConfig, TimeoutConfig};
pub use error::{ClientError, ClientResult};
pub use transport::{LineChannel, TcpChannel};

pub use ferrule_json_rpc::TextChannel;
