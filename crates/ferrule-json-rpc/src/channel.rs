use async_trait::async_trait;

use crate::error::JsonRpcTransportError;

/// A "send text, receive text" channel.
///
/// Everything that can carry JSON-RPC payloads implements this: a TCP
/// connection, an in-process server, a test double. `Ok(None)` means the peer
/// had nothing to send back (a payload made only of notifications).
#[async_trait]
pub trait TextChannel: Send + Sync {
    async fn exchange(&self, request: String) -> Result<Option<String>, JsonRpcTransportError>;
}

#[async_trait]
impl<T> TextChannel for std::sync::Arc<T>
where
    T: TextChannel + ?Sized,
{
    async fn exchange(&self, request: String) -> Result<Option<String>, JsonRpcTransportError> {
        (**self).exchange(request).await
    }
}
