use proc_macro2::Span;
use syn::{Attribute, ExprPath, LitStr, Path, spanned::Spanned};

use crate::REFLECT_ATTRIBUTE_NAME;

/// Lifecycle hooks named on the type.
#[derive(Default)]
pub(crate) struct HookPaths {
    pub before_serialize: Option<ExprPath>,
    pub after_serialize: Option<ExprPath>,
    pub before_deserialize: Option<ExprPath>,
    pub after_deserialize: Option<ExprPath>,
}

/// Type level `#[reflect(...)]` attributes.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub type_path: Option<LitStr>,
    pub former_paths: Vec<LitStr>,
    pub not_serializable: Option<Span>,
    pub no_default: Option<Span>,
    pub auto_register: Option<Span>,
    pub crate_path: Option<Path>,
    pub hooks: HookPaths,
}

impl TypeAttributes {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(REFLECT_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("type_path") {
                    let lit: LitStr = meta.value()?.parse()?;
                    validate_type_path(&lit)?;
                    this.type_path = Some(lit);
                } else if path.is_ident("former_path") {
                    this.former_paths.push(meta.value()?.parse()?);
                } else if path.is_ident("not_serializable") {
                    this.not_serializable = Some(path.span());
                } else if path.is_ident("no_default") {
                    this.no_default = Some(path.span());
                } else if path.is_ident("auto_register") {
                    this.auto_register = Some(path.span());
                } else if path.is_ident("crate") {
                    this.crate_path = Some(meta.value()?.parse()?);
                } else if path.is_ident("before_serialize") {
                    this.hooks.before_serialize = Some(meta.value()?.parse()?);
                } else if path.is_ident("after_serialize") {
                    this.hooks.after_serialize = Some(meta.value()?.parse()?);
                } else if path.is_ident("before_deserialize") {
                    this.hooks.before_deserialize = Some(meta.value()?.parse()?);
                } else if path.is_ident("after_deserialize") {
                    this.hooks.after_deserialize = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown type attribute"));
                }
                Ok(())
            })?;
        }
        Ok(this)
    }
}

fn validate_type_path(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    let valid = !value.is_empty()
        && value
            .split("::")
            .all(|segment| !segment.is_empty() && !segment.contains(['<', '>', ' ', ',']));
    if valid {
        Ok(())
    } else {
        Err(syn::Error::new(lit.span(), "expected a `::` separated path like \"my_crate::Foo\""))
    }
}

/// Field level `#[reflect(...)]` attributes.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub serialize: bool,
    pub skip: bool,
    pub former_names: Vec<LitStr>,
}

impl FieldAttributes {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(REFLECT_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("serialize") {
                    this.serialize = true;
                } else if meta.path.is_ident("skip") {
                    this.skip = true;
                } else if meta.path.is_ident("former_name") {
                    this.former_names.push(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
        if this.serialize && this.skip {
            return Err(syn::Error::new(
                attrs
                    .iter()
                    .find(|attr| attr.path().is_ident(REFLECT_ATTRIBUTE_NAME))
                    .map_or_else(Span::call_site, |attr| attr.span()),
                "`serialize` and `skip` exclude each other",
            ));
        }
        Ok(this)
    }
}
