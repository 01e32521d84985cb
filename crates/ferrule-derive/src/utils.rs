//! Attribute parsing and type inspection shared by the macros

use syn::{Attribute, Expr, LitStr, Result, Type};

/// Options of `#[param(...)]`
#[derive(Default)]
pub struct ParamMeta {
    /// `default = <expr>`: the parameter may be omitted
    pub default: Option<Expr>,
    /// `name = "..."`: name on the wire
    pub name: Option<String>,
}

/// Extract `#[param(...)]` options from parameter attributes
pub fn extract_param_meta(attrs: &[Attribute]) -> Result<ParamMeta> {
    let mut meta = ParamMeta::default();

    for attr in attrs {
        if attr.path().is_ident("param") {
            attr.parse_nested_meta(|nested_meta| {
                if nested_meta.path.is_ident("default") {
                    meta.default = Some(nested_meta.value()?.parse()?);
                } else if nested_meta.path.is_ident("name") {
                    let s: LitStr = nested_meta.value()?.parse()?;
                    meta.name = Some(s.value());
                } else {
                    return Err(nested_meta.error("expected `default = ...` or `name = \"...\"`"));
                }
                Ok(())
            })?;
        }
    }

    Ok(meta)
}

/// Options of `#[rpc_method(...)]`
#[derive(Default)]
pub struct MethodMeta {
    pub name: Option<String>,
}

/// Extract `#[rpc_method]` / `#[rpc_method(name = "...")]`.
/// Returns `None` when the method is not marked.
pub fn extract_method_meta(attrs: &[Attribute]) -> Result<Option<MethodMeta>> {
    let mut found = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("rpc_method")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[rpc_method] attribute"));
        }

        let mut meta = MethodMeta::default();
        if let syn::Meta::List(_) = &attr.meta {
            attr.parse_nested_meta(|nested_meta| {
                if nested_meta.path.is_ident("name") {
                    let s: LitStr = nested_meta.value()?.parse()?;
                    meta.name = Some(s.value());
                    Ok(())
                } else {
                    Err(nested_meta.error("expected `name = \"...\"`"))
                }
            })?;
        }
        found = Some(meta);
    }

    Ok(found)
}

/// Remove every attribute with the given name
pub fn strip_attrs(attrs: &mut Vec<Attribute>, name: &str) {
    attrs.retain(|attr| !attr.path().is_ident(name));
}

/// Check if a type is `Option<T>`
pub fn is_option_type(ty: &Type) -> bool {
    last_segment_is(ty, "Option")
}

/// Check if a type is a `Result`, including aliases such as `io::Result<T>`
pub fn is_result_type(ty: &Type) -> bool {
    last_segment_is(ty, "Result")
}

fn last_segment_is(ty: &Type, ident: &str) -> bool {
    if let Type::Path(type_path) = ty
        && type_path.qself.is_none()
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == ident;
    }
    false
}
