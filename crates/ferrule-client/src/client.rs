//! JSON-RPC client over any [`TextChannel`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use ferrule_json_rpc::error_codes::{INVALID_REQUEST, PARSE_ERROR};
use ferrule_json_rpc::{JsonRpcMessage, JsonRpcReply, JsonRpcRequest, RequestId, RequestParams, TextChannel};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ClientError, ClientResult};

/// Client issuing calls with increasing numeric ids
#[derive(Debug)]
pub struct JsonRpcClient<C> {
    channel: C,
    next_id: AtomicI64,
}

impl<C: TextChannel> JsonRpcClient<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Call `method` and decode its result.
    ///
    /// `params` must serialize to an object (named) or an array (positional);
    /// `()` sends no params at all.
    pub async fn call<R>(&self, method: &str, params: impl Serialize) -> ClientResult<R>
    where
        R: DeserializeOwned,
    {
        let value = self.call_value(method, to_params(params)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Call `method` and return the raw result
    pub async fn call_value(&self, method: &str, params: Option<RequestParams>) -> ClientResult<Value> {
        let id = self.next_id();
        let request = JsonRpcRequest::call(id.clone(), method, params);
        debug!(method, %id, "Sending request");

        let reply = self
            .channel
            .exchange(serde_json::to_string(&request)?)
            .await?
            .ok_or_else(|| ClientError::protocol(format!("no reply to request {}", id)))?;
        trace!(%reply, "Received reply");

        let message: JsonRpcMessage = serde_json::from_str(&reply)?;
        if !answers_request(&message, &id) {
            return Err(ClientError::protocol(format!(
                "reply id {} does not match request id {}",
                message.id().map_or_else(|| "<none>".to_string(), ToString::to_string),
                id
            )));
        }
        Ok(message.into_result()?)
    }

    /// Send a request without an `id`.
    ///
    /// Servers that answer notifications anyway may report an error, which is
    /// returned; a success reply is discarded.
    pub async fn notify(&self, method: &str, params: impl Serialize) -> ClientResult<()> {
        let request = JsonRpcRequest::notification(method, to_params(params)?);
        debug!(method, "Sending notification");

        let Some(reply) = self.channel.exchange(serde_json::to_string(&request)?).await? else {
            return Ok(());
        };
        match serde_json::from_str::<JsonRpcMessage>(&reply)? {
            JsonRpcMessage::Error(err) => Err(err.error.into()),
            JsonRpcMessage::Response(_) => Ok(()),
        }
    }

    /// Start collecting calls to send as one batch
    pub fn batch(&self) -> BatchRequest<'_, C> {
        BatchRequest {
            client: self,
            requests: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Calls and notifications sent together in one payload
#[derive(Debug)]
pub struct BatchRequest<'c, C> {
    client: &'c JsonRpcClient<C>,
    requests: Vec<JsonRpcRequest>,
    calls: Vec<RequestId>,
}

impl<C: TextChannel> BatchRequest<'_, C> {
    /// Queue a call; its result is reported by [`send`](Self::send) in the
    /// order calls were queued
    pub fn call(&mut self, method: &str, params: impl Serialize) -> ClientResult<&mut Self> {
        let id = self.client.next_id();
        self.requests
            .push(JsonRpcRequest::call(id.clone(), method, to_params(params)?));
        self.calls.push(id);
        Ok(self)
    }

    pub fn notify(&mut self, method: &str, params: impl Serialize) -> ClientResult<&mut Self> {
        self.requests
            .push(JsonRpcRequest::notification(method, to_params(params)?));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Send the batch and return one result per queued call.
    ///
    /// Replies are matched to calls by id, so the server may answer in any
    /// order. A reply to the whole payload (e.g. a parse error) fails the batch.
    pub async fn send(self) -> ClientResult<Vec<ClientResult<Value>>> {
        if self.requests.is_empty() {
            return Ok(Vec::new());
        }
        debug!(size = self.requests.len(), calls = self.calls.len(), "Sending batch");

        let payload = serde_json::to_string(&self.requests)?;
        let Some(reply) = self.client.channel.exchange(payload).await? else {
            return if self.calls.is_empty() {
                Ok(Vec::new())
            } else {
                Err(ClientError::protocol("no reply to batch"))
            };
        };

        let messages = match serde_json::from_str::<JsonRpcReply>(&reply)? {
            JsonRpcReply::Batch(messages) => messages,
            JsonRpcReply::Single(message) => {
                return match message.into_result() {
                    Err(err) => Err(err.into()),
                    Ok(_) => Err(ClientError::protocol("expected a batch reply")),
                };
            }
        };

        let mut by_id: HashMap<RequestId, JsonRpcMessage> = messages
            .into_iter()
            .filter_map(|message| message.id().cloned().map(|id| (id, message)))
            .collect();

        Ok(self
            .calls
            .into_iter()
            .map(|id| match by_id.remove(&id) {
                Some(message) => message.into_result().map_err(ClientError::from),
                None => Err(ClientError::protocol(format!("missing reply for request {}", id))),
            })
            .collect())
    }
}

/// A reply answers `id` if it echoes it. A `null` id is only accepted on the
/// errors a server raises before it can read the id.
fn answers_request(message: &JsonRpcMessage, id: &RequestId) -> bool {
    match message.id() {
        Some(reply_id) if reply_id == id => true,
        Some(RequestId::Null) => message
            .error_object()
            .is_some_and(|error| matches!(error.code, PARSE_ERROR | INVALID_REQUEST)),
        _ => false,
    }
}

fn to_params(params: impl Serialize) -> ClientResult<Option<RequestParams>> {
    RequestParams::from_value(serde_json::to_value(params)?)
        .map_err(|value| ClientError::protocol(format!("params must be an object or an array, got {}", value)))
}
