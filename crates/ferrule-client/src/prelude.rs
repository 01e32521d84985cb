//! Commonly used client types

pub use crate::client::{BatchRequest, JsonRpcClient};
pub use crate::config::{ClientConfig, TimeoutConfig};
pub use crate::error::{ClientError, ClientResult};
pub use crate::transport::{LineChannel, TcpChannel};
pub use ferrule_json_rpc::TextChannel;
