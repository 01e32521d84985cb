//! The registration capability every RPC service implements

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::error::Error as StdError;

use ferrule_json_rpc::RESERVED_METHOD_PREFIX;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::{MethodDescriptor, ServiceDescriptor};
use crate::errors::{ErrorDescriptor, ErrorRegistry, RpcErrorKind};

/// A type whose instances can be mounted on a dispatcher.
///
/// Usually implemented with `#[rpc_service]`; a hand-written impl lists its
/// methods and error kinds in [`register`](RpcService::register).
pub trait RpcService: Send + Sync + Sized + 'static {
    /// Whether this instance opted in to RPC exposure. Calls against an
    /// instance that did not are answered with `Method not found`.
    fn exposed(&self) -> bool {
        true
    }

    fn register(&self, registrar: &mut ServiceRegistrar<Self>);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("method name must not be empty")]
    EmptyMethodName,

    #[error("method `{0}` is registered more than once")]
    DuplicateMethod(String),

    #[error("method `{0}` uses the reserved `rpc.` prefix")]
    ReservedMethodName(String),

    #[error("method `{method}` declares parameter `{parameter}` more than once")]
    DuplicateParameter { method: String, parameter: String },

    #[error("invalid namespace `{0}`")]
    InvalidNamespace(String),

    #[error("namespace `{0}` is already mounted")]
    DuplicateNamespace(String),
}

/// Collects the methods and error kinds of one service during registration
pub struct ServiceRegistrar<S> {
    methods: Vec<MethodDescriptor<S>>,
    errors: ErrorRegistry,
}

impl<S: RpcService> ServiceRegistrar<S> {
    fn new() -> Self {
        Self {
            methods: Vec::new(),
            errors: ErrorRegistry::new(),
        }
    }

    pub fn method(&mut self, method: MethodDescriptor<S>) -> &mut Self {
        self.methods.push(method);
        self
    }

    /// Declare an error kind with its built-in code/message
    pub fn error_kind<E: RpcErrorKind>(&mut self) -> &mut Self {
        self.errors.register::<E>();
        self
    }

    /// Declare an error kind with an explicit descriptor
    pub fn error_descriptor<E>(&mut self, descriptor: ErrorDescriptor) -> &mut Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.errors.register_with::<E>(descriptor);
        self
    }

    fn finish(self, is_service: bool) -> Result<ServiceDescriptor<S>, RegistrationError> {
        let mut methods = HashMap::with_capacity(self.methods.len());

        for method in self.methods {
            validate_method(&method)?;
            match methods.entry(method.name().to_string()) {
                Entry::Occupied(entry) => {
                    return Err(RegistrationError::DuplicateMethod(entry.key().clone()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(method);
                }
            }
        }

        Ok(ServiceDescriptor::new(is_service, methods, self.errors))
    }
}

fn validate_method<S>(method: &MethodDescriptor<S>) -> Result<(), RegistrationError> {
    let name = method.name();
    if name.is_empty() {
        return Err(RegistrationError::EmptyMethodName);
    }
    if name.starts_with(RESERVED_METHOD_PREFIX) {
        return Err(RegistrationError::ReservedMethodName(name.to_string()));
    }

    let parameters = method.parameters();
    for (index, parameter) in parameters.iter().enumerate() {
        if parameters[..index].iter().any(|p| p.name == parameter.name) {
            return Err(RegistrationError::DuplicateParameter {
                method: name.to_string(),
                parameter: parameter.name.clone(),
            });
        }
    }
    Ok(())
}

/// Build the descriptor for a service instance.
///
/// The result depends only on what the instance registers, so calling this
/// twice for the same instance yields equal descriptors.
pub fn register_service<S: RpcService>(instance: &S) -> Result<ServiceDescriptor<S>, RegistrationError> {
    let mut registrar = ServiceRegistrar::new();
    instance.register(&mut registrar);
    let descriptor = registrar.finish(instance.exposed())?;

    debug!(
        service = std::any::type_name::<S>(),
        exposed = descriptor.is_service(),
        methods = ?descriptor.method_names(),
        "Registered service"
    );
    Ok(descriptor)
}
