//! Application error taxonomy and the mapper that turns a failed invocation
//! into a protocol error object.
//!
//! Service methods return any `std::error::Error`; it is carried as a
//! [`ServiceError`]. When the call fails, the mapper walks to the root cause of
//! the error chain and looks its kind up in the service's [`ErrorRegistry`].
//! Kinds are registered at service-registration time, either through
//! [`RpcErrorKind`] (usually derived with `#[derive(RpcError)]`) or with an
//! explicit [`ErrorDescriptor`].

use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;

use ferrule_json_rpc::JsonRpcErrorObject;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// The error type every service invocation fails with.
///
/// Any `E: std::error::Error + Send + Sync + 'static` converts into it with `?`.
pub struct ServiceError {
    inner: BoxedError,
}

impl ServiceError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(error),
        }
    }

    pub fn from_boxed(inner: BoxedError) -> Self {
        Self { inner }
    }

    /// An error carrying only a message. It never matches a registered kind.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(MessageError(message.to_string()))
    }

    /// The innermost error of the `source()` chain
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = &*self.inner;
        while let Some(source) = current.source() {
            current = source;
        }
        current
    }

    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Returns the outermost error if it is of type `E`
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> BoxedError {
        self.inner
    }
}

impl<E> From<E> for ServiceError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

/// Code and message attached to an application error kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub code: i64,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// An application error kind with a stable wire code.
///
/// An empty `MESSAGE` means "use the error's own `Display` text".
pub trait RpcErrorKind: StdError + Send + Sync + 'static {
    const CODE: i64;
    const MESSAGE: &'static str = "";

    fn descriptor() -> ErrorDescriptor {
        ErrorDescriptor::new(Self::CODE, Self::MESSAGE)
    }
}

struct ErrorEntry {
    type_id: TypeId,
    kind: &'static str,
    matches: fn(&(dyn StdError + 'static)) -> bool,
    descriptor: ErrorDescriptor,
}

fn is_kind<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

impl fmt::Debug for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEntry")
            .field("kind", &self.kind)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl Clone for ErrorEntry {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            kind: self.kind,
            matches: self.matches,
            descriptor: self.descriptor.clone(),
        }
    }
}

impl PartialEq for ErrorEntry {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.descriptor == other.descriptor
    }
}

/// Error kind → [`ErrorDescriptor`] table for one service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRegistry {
    entries: Vec<ErrorEntry>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind with its declared code/message
    pub fn register<E: RpcErrorKind>(&mut self) {
        self.register_with::<E>(E::descriptor());
    }

    /// Register a kind with an explicit descriptor. Registering the same kind
    /// again replaces its descriptor.
    pub fn register_with<E>(&mut self, descriptor: ErrorDescriptor)
    where
        E: StdError + Send + Sync + 'static,
    {
        let entry = ErrorEntry {
            type_id: TypeId::of::<E>(),
            kind: std::any::type_name::<E>(),
            matches: is_kind::<E>,
            descriptor,
        };
        match self.entries.iter_mut().find(|e| e.type_id == entry.type_id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor registered for the concrete kind of `error`, if any
    pub fn lookup(&self, error: &(dyn StdError + 'static)) -> Option<&ErrorDescriptor> {
        self.entries
            .iter()
            .find(|entry| (entry.matches)(error))
            .map(|entry| &entry.descriptor)
    }

    /// Map a failed invocation to the error object sent to the caller.
    ///
    /// The root cause decides: a registered kind yields its code and the
    /// descriptor message if non-blank, else the root cause's own message.
    /// Anything else collapses to `Internal error` and is only logged.
    pub fn map_error(&self, error: &ServiceError) -> JsonRpcErrorObject {
        let root = error.root_cause();
        match self.lookup(root) {
            Some(descriptor) => {
                let message = if descriptor.message.trim().is_empty() {
                    root.to_string()
                } else {
                    descriptor.message.clone()
                };
                debug!(code = descriptor.code, %message, "Mapped service error");
                JsonRpcErrorObject::application(descriptor.code, message)
            }
            None => {
                error!(error = %error, root_cause = %root, "Unmapped service error");
                JsonRpcErrorObject::internal_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("wrong pin")]
    struct CredentialError;

    impl RpcErrorKind for CredentialError {
        const CODE: i64 = 1;
        const MESSAGE: &'static str = "credential failure";
    }

    #[derive(Debug, Error)]
    #[error("account {0} is locked")]
    struct LockedError(u32);

    impl RpcErrorKind for LockedError {
        const CODE: i64 = 2;
    }

    #[derive(Debug, Error)]
    #[error("transfer failed")]
    struct TransferError {
        #[source]
        cause: LockedError,
    }

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Untagged;

    fn registry() -> ErrorRegistry {
        let mut registry = ErrorRegistry::new();
        registry.register::<CredentialError>();
        registry.register::<LockedError>();
        registry
    }

    #[test]
    fn test_tagged_kind_uses_descriptor_message() {
        let mapped = registry().map_error(&ServiceError::new(CredentialError));
        assert_eq!(mapped, JsonRpcErrorObject::application(1, "credential failure"));
    }

    #[test]
    fn test_blank_descriptor_message_falls_back_to_display() {
        let mapped = registry().map_error(&ServiceError::new(LockedError(7)));
        assert_eq!(mapped.code, 2);
        assert_eq!(mapped.message, "account 7 is locked");
    }

    #[test]
    fn test_root_cause_decides() {
        let error = ServiceError::new(TransferError {
            cause: LockedError(3),
        });
        assert_eq!(error.root_cause().to_string(), "account 3 is locked");
        assert_eq!(registry().map_error(&error).code, 2);
    }

    #[test]
    fn test_unmapped_is_internal_error() {
        let mapped = registry().map_error(&ServiceError::new(Untagged));
        assert_eq!(mapped.code, -32603);
        assert_eq!(mapped.message, "Internal error");
        assert!(mapped.data.is_none());

        let mapped = registry().map_error(&ServiceError::msg("boom"));
        assert_eq!(mapped.code, -32603);
    }

    #[test]
    fn test_reregistering_replaces_descriptor() {
        let mut registry = registry();
        registry.register_with::<CredentialError>(ErrorDescriptor::new(10, ""));
        assert_eq!(registry.len(), 2);
        let mapped = registry.map_error(&ServiceError::new(CredentialError));
        assert_eq!(mapped, JsonRpcErrorObject::application(10, "wrong pin"));
    }

    #[test]
    fn test_question_mark_converts() {
        fn fails() -> Result<(), ServiceError> {
            Err(CredentialError)?;
            Ok(())
        }
        let error = fails().unwrap_err();
        assert!(error.downcast_ref::<CredentialError>().is_some());
    }
}
