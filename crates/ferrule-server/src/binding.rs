//! Parameter binding: JSON `params` → typed, call-ordered arguments

use ferrule_json_rpc::RequestParams;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{BoundValue, ParameterDescriptor};
use crate::errors::ServiceError;

/// Why `params` could not be bound. The `Display` text is sent to the caller
/// as the `data` of an `Invalid params` error, so it names the parameter but
/// never the Rust type.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("missing required parameter `{name}`")]
    MissingParameter { name: String },

    #[error("parameter `{name}` has the wrong type")]
    InvalidType {
        name: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected at most {expected} positional parameters, got {given}")]
    TooManyParameters { expected: usize, given: usize },
}

/// Misuse of [`Arguments`] by an invoker. Never caused by the caller's input.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("no argument bound at position {0}")]
    Missing(usize),

    #[error("argument at position {position} is not a `{expected}`")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
    },
}

/// Decoded arguments in call order. Invokers take each slot exactly once.
#[derive(Debug, Default)]
pub struct Arguments {
    slots: Vec<Option<BoundValue>>,
}

impl Arguments {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_set(&self, position: usize) -> bool {
        matches!(self.slots.get(position), Some(Some(_)))
    }

    pub(crate) fn set(&mut self, position: usize, value: BoundValue) {
        if position >= self.slots.len() {
            self.slots.resize_with(position + 1, || None);
        }
        self.slots[position] = Some(value);
    }

    /// Take a required argument
    pub fn take<T: 'static>(&mut self, position: usize) -> Result<T, ServiceError> {
        self.take_optional::<T>(position)?
            .ok_or_else(|| ArgumentError::Missing(position).into())
    }

    /// Take an argument the caller was allowed to omit
    pub fn take_optional<T: 'static>(&mut self, position: usize) -> Result<Option<T>, ServiceError> {
        let slot = self
            .slots
            .get_mut(position)
            .ok_or(ArgumentError::Missing(position))?;

        match slot.take() {
            None => Ok(None),
            Some(bound) => match bound.downcast::<T>() {
                Ok(value) => Ok(Some(*value)),
                Err(bound) => {
                    *slot = Some(bound);
                    Err(ArgumentError::TypeMismatch {
                        position,
                        expected: std::any::type_name::<T>(),
                    }
                    .into())
                }
            },
        }
    }
}

/// Bind `params` against a method's parameters.
///
/// Objects bind by name and ignore members no parameter asks for; arrays bind
/// by position. `null` for an optional parameter counts as omitted.
pub fn bind_arguments(
    parameters: &[ParameterDescriptor],
    params: Option<RequestParams>,
) -> Result<Arguments, BindError> {
    let mut arguments = Arguments::with_len(parameters.len());

    match params {
        None => {}
        Some(RequestParams::Object(mut members)) => {
            for parameter in parameters {
                if let Some(value) = members.remove(&parameter.name) {
                    bind_one(parameter, value, &mut arguments)?;
                }
            }
        }
        Some(RequestParams::Array(values)) => {
            if values.len() > parameters.len() {
                return Err(BindError::TooManyParameters {
                    expected: parameters.len(),
                    given: values.len(),
                });
            }
            for (parameter, value) in parameters.iter().zip(values) {
                bind_one(parameter, value, &mut arguments)?;
            }
        }
    }

    if let Some(missing) = parameters
        .iter()
        .find(|p| !p.optional && !arguments.is_set(p.position))
    {
        return Err(BindError::MissingParameter {
            name: missing.name.clone(),
        });
    }

    Ok(arguments)
}

fn bind_one(parameter: &ParameterDescriptor, value: Value, arguments: &mut Arguments) -> Result<(), BindError> {
    if value.is_null() && parameter.optional {
        return Ok(());
    }

    let bound = parameter
        .declared_type
        .decode(value)
        .map_err(|source| BindError::InvalidType {
            name: parameter.name.clone(),
            expected: parameter.declared_type.name(),
            source,
        })?;
    arguments.set(parameter.position, bound);
    Ok(())
}
