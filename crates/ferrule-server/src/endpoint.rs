//! A registered service instance behind its lock, erased to a trait object

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use ferrule_json_rpc::{JsonRpcErrorObject, RequestParams};
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::binding::bind_arguments;
use crate::descriptor::{MethodHandle, ServiceDescriptor};
use crate::service::RpcService;

#[async_trait]
pub(crate) trait ServiceEndpoint: Send + Sync {
    /// Whether a call to `method` can be routed here
    fn serves(&self, method: &str) -> bool;

    /// Bind, invoke and map the outcome of one call
    async fn call(&self, method: &str, params: Option<RequestParams>) -> Result<Value, JsonRpcErrorObject>;
}

/// One service instance. Shared handles run under the read lock, exclusive
/// handles under the write lock, so `&mut self` methods never overlap with any
/// other call on the same instance.
pub(crate) struct MountedService<S> {
    descriptor: Arc<ServiceDescriptor<S>>,
    instance: RwLock<S>,
}

impl<S: RpcService> MountedService<S> {
    pub(crate) fn new(descriptor: Arc<ServiceDescriptor<S>>, instance: S) -> Self {
        Self {
            descriptor,
            instance: RwLock::new(instance),
        }
    }
}

#[async_trait]
impl<S: RpcService> ServiceEndpoint for MountedService<S> {
    fn serves(&self, method: &str) -> bool {
        self.descriptor.is_service() && self.descriptor.method(method).is_some()
    }

    async fn call(&self, method: &str, params: Option<RequestParams>) -> Result<Value, JsonRpcErrorObject> {
        let descriptor = match self.descriptor.method(method) {
            Some(descriptor) if self.descriptor.is_service() => descriptor,
            _ => return Err(JsonRpcErrorObject::method_not_found()),
        };

        let arguments = bind_arguments(descriptor.parameters(), params).map_err(|error| {
            debug!(method, error = ?error, "Parameter binding failed");
            JsonRpcErrorObject::invalid_params(&error.to_string())
        })?;

        let invocation = async move {
            match descriptor.handle() {
                MethodHandle::Shared(invoke) => {
                    let guard = self.instance.read().await;
                    invoke(&*guard, arguments).await
                }
                MethodHandle::Exclusive(invoke) => {
                    let mut guard = self.instance.write().await;
                    invoke(&mut *guard, arguments).await
                }
            }
        };

        // A panicking method fails its own call only
        let outcome = match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!(method, panic = panic_message(&*panic), "Service method panicked");
                return Err(JsonRpcErrorObject::internal_error());
            }
        };

        outcome.map_err(|error| self.descriptor.errors().map_error(&error))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
