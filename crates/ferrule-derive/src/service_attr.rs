//! Implementation of the #[rpc_service] attribute macro

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, LitBool, Pat, Path, Result, ReturnType, Type, Visibility};

use crate::utils::{ParamMeta, extract_method_meta, extract_param_meta, is_option_type, is_result_type, strip_attrs};

/// Arguments of `#[rpc_service(...)]`
pub struct ServiceArgs {
    pub exposed: bool,
    pub errors: Vec<Path>,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            exposed: true,
            errors: Vec::new(),
        }
    }
}

impl ServiceArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("exposed") {
            let lit: LitBool = meta.value()?.parse()?;
            self.exposed = lit.value;
            Ok(())
        } else if meta.path.is_ident("errors") {
            meta.parse_nested_meta(|kind| {
                self.errors.push(kind.path);
                Ok(())
            })
        } else {
            Err(meta.error("expected `exposed = <bool>` or `errors(...)`"))
        }
    }
}

enum Receiver {
    Shared,
    Exclusive,
}

struct RpcParam {
    wire_name: String,
    ty: Type,
    meta: ParamMeta,
}

struct RpcMethod {
    ident: syn::Ident,
    wire_name: String,
    receiver: Receiver,
    is_async: bool,
    output: ReturnType,
    params: Vec<RpcParam>,
}

pub fn rpc_service_impl(args: ServiceArgs, mut input: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[rpc_service] must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[rpc_service] does not support generic services",
        ));
    }

    let mut methods = Vec::new();
    for item in &mut input.items {
        if let ImplItem::Fn(method) = item
            && let Some(rpc_method) = analyze_method(method)?
        {
            methods.push(rpc_method);
        }
    }

    let self_ty = &input.self_ty;
    let exposed = args.exposed;
    let invokers = methods.iter().map(|method| generate_invoker(self_ty, method));
    let registrations = methods.iter().map(generate_registration);
    let error_kinds = args.errors.iter().map(|kind| {
        quote! { registrar.error_kind::<#kind>(); }
    });

    Ok(quote! {
        #input

        #[automatically_derived]
        impl ::ferrule_server::RpcService for #self_ty {
            fn exposed(&self) -> bool {
                #exposed
            }

            fn register(&self, registrar: &mut ::ferrule_server::ServiceRegistrar<Self>) {
                #(#invokers)*
                #(#registrations)*
                #(#error_kinds)*
            }
        }
    })
}

/// Strip the macro's helper attributes from `method` and describe it if it is
/// an eligible RPC method
fn analyze_method(method: &mut ImplItemFn) -> Result<Option<RpcMethod>> {
    let method_meta = extract_method_meta(&method.attrs)?;
    strip_attrs(&mut method.attrs, "rpc_method");

    let mut typed_inputs = Vec::new();
    let mut receiver = None;
    for input in method.sig.inputs.iter_mut() {
        match input {
            FnArg::Receiver(recv) => {
                receiver = match (&recv.reference, &recv.mutability, &recv.colon_token) {
                    (Some(_), None, None) => Some(Receiver::Shared),
                    (Some(_), Some(_), None) => Some(Receiver::Exclusive),
                    _ => None,
                };
            }
            FnArg::Typed(pat_type) => {
                let meta = extract_param_meta(&pat_type.attrs)?;
                strip_attrs(&mut pat_type.attrs, "param");
                typed_inputs.push((meta, pat_type.clone()));
            }
        }
    }

    let Some(method_meta) = method_meta else {
        return Ok(None);
    };
    // Only public methods are callable remotely
    if !matches!(method.vis, Visibility::Public(_)) {
        return Ok(None);
    }

    let Some(receiver) = receiver else {
        return Err(syn::Error::new_spanned(
            &method.sig,
            "rpc methods must take `&self` or `&mut self`",
        ));
    };
    if !method.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &method.sig.generics,
            "rpc methods cannot be generic",
        ));
    }

    let mut params = Vec::with_capacity(typed_inputs.len());
    for (meta, pat_type) in typed_inputs {
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "rpc method parameters must be plain identifiers",
            ));
        };
        let wire_name = meta
            .name
            .clone()
            .unwrap_or_else(|| pat_ident.ident.unraw().to_string());
        params.push(RpcParam {
            wire_name,
            ty: (*pat_type.ty).clone(),
            meta,
        });
    }

    let ident = method.sig.ident.clone();
    Ok(Some(RpcMethod {
        wire_name: method_meta.name.unwrap_or_else(|| ident.unraw().to_string()),
        ident,
        receiver,
        is_async: method.sig.asyncness.is_some(),
        output: method.sig.output.clone(),
        params,
    }))
}

fn invoker_ident(method: &RpcMethod) -> syn::Ident {
    format_ident!("__ferrule_invoke_{}", method.ident.unraw())
}

fn generate_invoker(self_ty: &Type, method: &RpcMethod) -> TokenStream {
    let invoker = invoker_ident(method);
    let method_ident = &method.ident;

    let service_ty = match method.receiver {
        Receiver::Shared => quote! { &'a #self_ty },
        Receiver::Exclusive => quote! { &'a mut #self_ty },
    };

    let mut extractions = Vec::new();
    let mut call_args = Vec::new();
    for (position, param) in method.params.iter().enumerate() {
        let var = format_ident!("__arg{}", position);
        let ty = &param.ty;
        let extraction = match (&param.meta.default, is_option_type(ty)) {
            (Some(default), _) => quote! {
                let #var: #ty = __args.take_optional::<#ty>(#position)?.unwrap_or_else(|| #default);
            },
            (None, true) => quote! {
                let #var: #ty = __args.take_optional::<#ty>(#position)?.flatten();
            },
            (None, false) => quote! {
                let #var: #ty = __args.take::<#ty>(#position)?;
            },
        };
        extractions.push(extraction);
        call_args.push(var);
    }

    let call = if method.is_async {
        quote! { __service.#method_ident(#(#call_args),*).await }
    } else {
        quote! { __service.#method_ident(#(#call_args),*) }
    };

    let body = match &method.output {
        ReturnType::Default => quote! {
            #call;
            ::ferrule_server::to_result_value(())
        },
        ReturnType::Type(_, ty) if is_result_type(ty) => quote! {
            ::ferrule_server::to_result_value(#call?)
        },
        ReturnType::Type(..) => quote! {
            ::ferrule_server::to_result_value(#call)
        },
    };

    quote! {
        #[allow(unused_mut, unused_variables, non_snake_case)]
        fn #invoker<'a>(
            __service: #service_ty,
            mut __args: ::ferrule_server::Arguments,
        ) -> ::ferrule_server::BoxFuture<'a, ::ferrule_server::InvokeResult> {
            ::std::boxed::Box::pin(async move {
                #(#extractions)*
                #body
            })
        }
    }
}

fn generate_registration(method: &RpcMethod) -> TokenStream {
    let invoker = invoker_ident(method);
    let wire_name = &method.wire_name;

    let constructor = match method.receiver {
        Receiver::Shared => quote! { shared },
        Receiver::Exclusive => quote! { exclusive },
    };

    let params = method.params.iter().map(|param| {
        let ty = &param.ty;
        let name = &param.wire_name;
        if param.meta.default.is_some() || is_option_type(ty) {
            quote! { .optional_param::<#ty>(#name) }
        } else {
            quote! { .param::<#ty>(#name) }
        }
    });

    quote! {
        registrar.method(
            ::ferrule_server::MethodDescriptor::<Self>::#constructor(#wire_name, #invoker)
                #(#params)*
        );
    }
}
