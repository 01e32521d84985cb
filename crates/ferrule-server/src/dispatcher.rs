//! The request pipeline: parse → validate → route → bind → invoke → wrap

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferrule_json_rpc::{
    IncomingPayload, JsonRpcError, JsonRpcErrorObject, JsonRpcMessage, JsonRpcReply, JsonRpcRequest,
    JsonRpcTransportError, TextChannel, decode_request, parse_payload, parse_value,
};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::descriptor::ServiceDescriptor;
use crate::endpoint::{MountedService, ServiceEndpoint};
use crate::service::{RegistrationError, RpcService, register_service};

/// Wire text used when a reply cannot be serialized at all
const INTERNAL_ERROR_FALLBACK: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// Dispatcher behaviour that is independent of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// When `true`, requests without an `id` are executed but not answered.
    /// Off by default: legacy callers never send an `id` and still expect a reply.
    pub strict_notifications: bool,
    /// Upper bound for a single invocation
    pub invoke_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            strict_notifications: false, // lenient mode
            invoke_timeout: Duration::from_secs(30),
        }
    }
}

/// Routes JSON-RPC requests to registered services.
///
/// Services are registered up front; the dispatcher is then shared (usually
/// behind an `Arc`) and never mutated while handling requests.
#[derive(Default)]
pub struct Dispatcher {
    root: Vec<Arc<dyn ServiceEndpoint>>,
    namespaces: HashMap<String, Arc<dyn ServiceEndpoint>>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DispatchOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    pub fn set_options(&mut self, options: DispatchOptions) {
        self.options = options;
    }

    /// Mount a service so its methods are called by their bare names
    pub fn register_service<S: RpcService>(
        &mut self,
        instance: S,
    ) -> Result<Arc<ServiceDescriptor<S>>, RegistrationError> {
        let descriptor = Arc::new(register_service(&instance)?);
        self.root
            .push(Arc::new(MountedService::new(Arc::clone(&descriptor), instance)));
        Ok(descriptor)
    }

    /// Mount a service so its methods are called as `"<namespace>.<method>"`
    pub fn register_service_at<S: RpcService>(
        &mut self,
        namespace: &str,
        instance: S,
    ) -> Result<Arc<ServiceDescriptor<S>>, RegistrationError> {
        if namespace.is_empty() || namespace.contains('.') || namespace == "rpc" {
            return Err(RegistrationError::InvalidNamespace(namespace.to_string()));
        }

        let descriptor = Arc::new(register_service(&instance)?);
        match self.namespaces.entry(namespace.to_string()) {
            Entry::Occupied(_) => Err(RegistrationError::DuplicateNamespace(namespace.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(MountedService::new(Arc::clone(&descriptor), instance)));
                Ok(descriptor)
            }
        }
    }

    /// Number of mounted service instances
    pub fn service_count(&self) -> usize {
        self.root.len() + self.namespaces.len()
    }

    fn route<'m>(&self, method: &'m str) -> Option<(&Arc<dyn ServiceEndpoint>, &'m str)> {
        if let Some((namespace, local)) = method.split_once('.')
            && let Some(endpoint) = self.namespaces.get(namespace)
            && endpoint.serves(local)
        {
            return Some((endpoint, local));
        }

        self.root
            .iter()
            .find(|endpoint| endpoint.serves(method))
            .map(|endpoint| (endpoint, method))
    }

    /// Handle raw wire text. `None` means there is nothing to send back.
    pub async fn handle_text(&self, text: &str) -> Option<String> {
        let reply = match parse_payload(text) {
            Ok(payload) => self.handle_payload(payload).await,
            Err(error) => {
                warn!(code = error.error.code, "Rejected payload");
                Some(JsonRpcReply::Single(error.into()))
            }
        };
        reply.map(|reply| encode_reply(&reply))
    }

    /// Handle an already parsed JSON value
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcReply> {
        match parse_value(value) {
            Ok(payload) => self.handle_payload(payload).await,
            Err(error) => {
                warn!(code = error.error.code, "Rejected payload");
                Some(JsonRpcReply::Single(error.into()))
            }
        }
    }

    async fn handle_payload(&self, payload: IncomingPayload) -> Option<JsonRpcReply> {
        match payload {
            IncomingPayload::Single(value) => self.handle_element(value).await.map(JsonRpcReply::Single),
            IncomingPayload::Batch(values) => {
                debug!(size = values.len(), "Handling batch");
                let replies: Vec<JsonRpcMessage> = join_all(values.into_iter().map(|value| self.handle_element(value)))
                    .await
                    .into_iter()
                    .flatten()
                    .collect();

                if replies.is_empty() {
                    None
                } else {
                    Some(JsonRpcReply::Batch(replies))
                }
            }
        }
    }

    async fn handle_element(&self, value: Value) -> Option<JsonRpcMessage> {
        let request = match decode_request(value) {
            Ok(request) => request,
            Err(error) => {
                warn!(id = ?error.id, "Invalid request");
                return Some(error.into());
            }
        };

        let silent = request.is_notification() && self.options.strict_notifications;
        let reply = self.handle_request(request).await;
        if silent {
            debug!("Suppressing reply to notification");
            None
        } else {
            Some(reply)
        }
    }

    /// Validate, route, bind and invoke one decoded request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        if let Err(error) = request.validate() {
            warn!(method = %request.method, "Reserved method name");
            return error.into();
        }

        let JsonRpcRequest { method, params, id, .. } = request;

        let Some((endpoint, local)) = self.route(&method) else {
            debug!(%method, "Method not found");
            return JsonRpcError::method_not_found(id).into();
        };

        debug!(%method, id = ?id, "Dispatching request");
        match tokio::time::timeout(self.options.invoke_timeout, endpoint.call(local, params)).await {
            Ok(Ok(result)) => JsonRpcMessage::success(id, result),
            Ok(Err(error)) => JsonRpcMessage::error(id, error),
            Err(_) => {
                warn!(%method, timeout = ?self.options.invoke_timeout, "Invocation timed out");
                JsonRpcMessage::error(id, JsonRpcErrorObject::internal_error())
            }
        }
    }
}

#[async_trait]
impl TextChannel for Dispatcher {
    async fn exchange(&self, request: String) -> Result<Option<String>, JsonRpcTransportError> {
        Ok(self.handle_text(&request).await)
    }
}

pub(crate) fn encode_reply(reply: &JsonRpcReply) -> String {
    serde_json::to_string(reply).unwrap_or_else(|error| {
        error!(error = %error, "Failed to serialize reply");
        INTERNAL_ERROR_FALLBACK.to_string()
    })
}

pub(crate) fn encode_error(error: JsonRpcError) -> String {
    encode_reply(&JsonRpcReply::Single(error.into()))
}
