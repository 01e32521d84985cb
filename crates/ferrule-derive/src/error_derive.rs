//! Implementation of #[derive(RpcError)]

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, LitStr, Result};

pub fn derive_rpc_error_impl(input: DeriveInput) -> Result<TokenStream> {
    let mut code: Option<Expr> = None;
    let mut message: Option<LitStr> = None;

    for attr in &input.attrs {
        if attr.path().is_ident("rpc_error") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("code") {
                    code = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("message") {
                    message = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("expected `code = <int>` or `message = \"...\"`"));
                }
                Ok(())
            })?;
        }
    }

    let code = code.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "Missing 'code' in #[rpc_error(code = ..., message = \"...\")]",
        )
    })?;
    let message = message
        .map(|lit| lit.value())
        .unwrap_or_default();

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::ferrule_server::RpcErrorKind for #name #ty_generics #where_clause {
            const CODE: i64 = #code;
            const MESSAGE: &'static str = #message;
        }
    })
}
