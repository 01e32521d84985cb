//! Registry metadata: what a service exposes and how to call it

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::binding::Arguments;
use crate::errors::{ErrorRegistry, ServiceError};

/// Outcome of one invocation, before error mapping
pub type InvokeResult = Result<Value, ServiceError>;

/// A decoded parameter value, waiting to be taken by the invoker
pub type BoundValue = Box<dyn Any + Send>;

/// Invoker for methods that only need `&self`
pub type SharedInvoker<S> = for<'a> fn(&'a S, Arguments) -> BoxFuture<'a, InvokeResult>;

/// Invoker for methods that need `&mut self`
pub type ExclusiveInvoker<S> = for<'a> fn(&'a mut S, Arguments) -> BoxFuture<'a, InvokeResult>;

/// The declared Rust type of a parameter, with the decoder that produces it
#[derive(Clone, Copy)]
pub struct DeclaredType {
    name: &'static str,
    decode: fn(Value) -> Result<BoundValue, serde_json::Error>,
}

fn decode_as<T>(value: Value) -> Result<BoundValue, serde_json::Error>
where
    T: DeserializeOwned + Send + 'static,
{
    serde_json::from_value::<T>(value).map(|decoded| Box::new(decoded) as BoundValue)
}

impl DeclaredType {
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            name: std::any::type_name::<T>(),
            decode: decode_as::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn decode(&self, value: Value) -> Result<BoundValue, serde_json::Error> {
        (self.decode)(value)
    }
}

impl fmt::Debug for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for DeclaredType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DeclaredType {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub declared_type: DeclaredType,
    /// 0-based call-order index
    pub position: usize,
    /// Whether the parameter may be omitted (a default applies)
    pub optional: bool,
}

/// How a method reaches its service instance
pub enum MethodHandle<S> {
    Shared(SharedInvoker<S>),
    Exclusive(ExclusiveInvoker<S>),
}

impl<S> MethodHandle<S> {
    pub fn is_exclusive(&self) -> bool {
        matches!(self, MethodHandle::Exclusive(_))
    }
}

impl<S> Clone for MethodHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for MethodHandle<S> {}

impl<S> fmt::Debug for MethodHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodHandle::Shared(_) => f.write_str("Shared"),
            MethodHandle::Exclusive(_) => f.write_str("Exclusive"),
        }
    }
}

/// One callable method.
///
/// Parameters are appended in declaration order and get consecutive positions.
///
/// ```rust,ignore
/// MethodDescriptor::shared("subtract", invoke_subtract)
///     .param::<i64>("a")
///     .optional_param::<i64>("b")
/// ```
pub struct MethodDescriptor<S> {
    name: String,
    handle: MethodHandle<S>,
    parameters: Vec<ParameterDescriptor>,
}

impl<S> MethodDescriptor<S> {
    pub fn new(name: impl Into<String>, handle: MethodHandle<S>) -> Self {
        Self {
            name: name.into(),
            handle,
            parameters: Vec::new(),
        }
    }

    pub fn shared(name: impl Into<String>, invoker: SharedInvoker<S>) -> Self {
        Self::new(name, MethodHandle::Shared(invoker))
    }

    pub fn exclusive(name: impl Into<String>, invoker: ExclusiveInvoker<S>) -> Self {
        Self::new(name, MethodHandle::Exclusive(invoker))
    }

    /// Append a required parameter
    pub fn param<T>(self, name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.push_param(name.into(), DeclaredType::of::<T>(), false)
    }

    /// Append a parameter that may be omitted
    pub fn optional_param<T>(self, name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.push_param(name.into(), DeclaredType::of::<T>(), true)
    }

    fn push_param(mut self, name: String, declared_type: DeclaredType, optional: bool) -> Self {
        let position = self.parameters.len();
        self.parameters.push(ParameterDescriptor {
            name,
            declared_type,
            position,
            optional,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> MethodHandle<S> {
        self.handle
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }
}

impl<S> Clone for MethodDescriptor<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handle: self.handle,
            parameters: self.parameters.clone(),
        }
    }
}

impl<S> fmt::Debug for MethodDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("parameters", &self.parameters)
            .finish()
    }
}

// Invokers are compared by kind only; two registrations of the same service
// produce the same table even if the compiler duplicates the functions.
impl<S> PartialEq for MethodDescriptor<S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.handle.is_exclusive() == other.handle.is_exclusive()
            && self.parameters == other.parameters
    }
}

/// Everything the dispatcher knows about one registered service instance.
/// Built once by [`register_service`](crate::register_service), read-only afterwards.
pub struct ServiceDescriptor<S> {
    is_service: bool,
    methods: HashMap<String, MethodDescriptor<S>>,
    errors: ErrorRegistry,
}

impl<S> ServiceDescriptor<S> {
    pub(crate) fn new(
        is_service: bool,
        methods: HashMap<String, MethodDescriptor<S>>,
        errors: ErrorRegistry,
    ) -> Self {
        Self {
            is_service,
            methods,
            errors,
        }
    }

    /// Whether the instance opted in to RPC exposure
    pub fn is_service(&self) -> bool {
        self.is_service
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor<S>> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor<S>> {
        self.methods.values()
    }

    /// Method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn errors(&self) -> &ErrorRegistry {
        &self.errors
    }
}

impl<S> fmt::Debug for ServiceDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("is_service", &self.is_service)
            .field("methods", &self.method_names())
            .field("errors", &self.errors)
            .finish()
    }
}

impl<S> PartialEq for ServiceDescriptor<S> {
    fn eq(&self, other: &Self) -> bool {
        self.is_service == other.is_service
            && self.methods == other.methods
            && self.errors == other.errors
    }
}
