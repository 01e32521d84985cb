//! # Ferrule Derive Macros
//!
//! Code generation for ferrule services, replacing runtime reflection with a
//! registration table written at compile time.
//!
//! - `#[rpc_service]` - implement `RpcService` for an inherent impl block
//! - `#[rpc_method]` - mark a public method as remotely callable
//! - `#[param(...)]` - per-parameter defaults and wire names
//! - `#[derive(RpcError)]` - attach a wire code/message to an error kind
//!
//! The generated code refers to `::ferrule_server`, so use these macros
//! through its re-exports.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

mod error_derive;
mod service_attr;
mod utils;

/// Attribute macro that implements `RpcService` for an impl block
///
/// Every `pub` method marked with `#[rpc_method]` is registered. Methods taking
/// `&self` may run concurrently; methods taking `&mut self` run alone.
///
/// # Arguments
///
/// - `exposed = <bool>` - whether the instance accepts calls (default `true`)
/// - `errors(TypeA, TypeB)` - error kinds implementing `RpcErrorKind`
///
/// # Example
///
/// ```rust,ignore
/// use ferrule_server::prelude::*;
///
/// struct Bank { balance: i64 }
///
/// #[rpc_service(errors(CredentialError))]
/// impl Bank {
///     #[rpc_method]
///     pub fn balance(&self) -> i64 { self.balance }
///
///     #[rpc_method(name = "deposit")]
///     pub async fn put(&mut self, amount: i64, #[param(default = false)] audit: bool) -> Result<i64, CredentialError> {
///         self.balance += amount;
///         Ok(self.balance)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn rpc_service(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut service_args = service_attr::ServiceArgs::default();
    let parser = syn::meta::parser(|meta| service_args.parse(meta));
    parse_macro_input!(args with parser);
    let input = parse_macro_input!(input as ItemImpl);
    service_attr::rpc_service_impl(service_args, input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Marks a method inside an `#[rpc_service]` impl block
///
/// This attribute is only processed by the #[rpc_service] macro.
/// When used alone, it just passes through the input unchanged.
#[proc_macro_attribute]
pub fn rpc_method(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Helper attribute for parameter metadata in `#[rpc_method]` methods
#[proc_macro_attribute]
pub fn param(_args: TokenStream, input: TokenStream) -> TokenStream {
    // This attribute is only processed by the #[rpc_service] macro
    input
}

/// Derive macro that implements `RpcErrorKind`
///
/// ```rust,ignore
/// #[derive(Debug, thiserror::Error, RpcError)]
/// #[error("wrong pin")]
/// #[rpc_error(code = 1, message = "credential failure")]
/// struct CredentialError;
/// ```
#[proc_macro_derive(RpcError, attributes(rpc_error))]
pub fn derive_rpc_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    error_derive::derive_rpc_error_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
