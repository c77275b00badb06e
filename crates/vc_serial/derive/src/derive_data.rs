use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Expr, Fields, Ident, Index, Member, Type, Visibility, spanned::Spanned};

use crate::attributes::{FieldAttributes, TypeAttributes};

/// One field of a derived struct.
pub(crate) struct StructField<'a> {
    pub member: Member,
    pub ty: &'a Type,
    pub public: bool,
    pub attrs: FieldAttributes,
}

impl StructField<'_> {
    /// The name written to streams: the ident, or the index of a tuple field.
    pub(crate) fn name(&self) -> String {
        match &self.member {
            Member::Named(ident) => ident.to_string(),
            Member::Unnamed(index) => index.index.to_string(),
        }
    }
}

/// One unit variant with its discriminant expression.
pub(crate) struct EnumVariant<'a> {
    pub ident: &'a Ident,
    pub discriminant: TokenStream,
}

pub(crate) enum ReflectData<'a> {
    Struct(Vec<StructField<'a>>),
    Enum(Vec<EnumVariant<'a>>),
}

/// Everything the generators need from a `DeriveInput`.
pub(crate) struct ReflectDerive<'a> {
    pub ident: &'a Ident,
    pub attrs: TypeAttributes,
    pub data: ReflectData<'a>,
}

impl<'a> ReflectDerive<'a> {
    pub(crate) fn from_input(input: &'a DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "`#[derive(Reflect)]` does not support generic types",
            ));
        }
        let attrs = TypeAttributes::parse(&input.attrs)?;

        let data = match &input.data {
            Data::Struct(data) => ReflectData::Struct(parse_fields(&data.fields)?),
            Data::Enum(data) => {
                if data.variants.is_empty() {
                    return Err(syn::Error::new(
                        input.ident.span(),
                        "`#[derive(Reflect)]` needs at least one variant",
                    ));
                }
                let mut variants = Vec::with_capacity(data.variants.len());
                // Implicit discriminants count up from the last explicit one.
                let mut base: Option<&Expr> = None;
                let mut offset = 0i64;
                for variant in &data.variants {
                    if !matches!(variant.fields, Fields::Unit) {
                        return Err(syn::Error::new(
                            variant.span(),
                            "`#[derive(Reflect)]` only supports enums without fields",
                        ));
                    }
                    if let Some((_, expr)) = &variant.discriminant {
                        base = Some(expr);
                        offset = 0;
                    }
                    let discriminant = match base {
                        Some(expr) => quote! { ((#expr) as i64 + #offset) },
                        None => offset.to_token_stream(),
                    };
                    offset += 1;
                    variants.push(EnumVariant {
                        ident: &variant.ident,
                        discriminant,
                    });
                }
                ReflectData::Enum(variants)
            }
            Data::Union(data) => {
                return Err(syn::Error::new(
                    data.union_token.span(),
                    "`#[derive(Reflect)]` does not support unions",
                ));
            }
        };

        Ok(Self {
            ident: &input.ident,
            attrs,
            data,
        })
    }

    /// Path of the `vc_serial` crate as seen from the deriving crate.
    pub(crate) fn crate_path(&self) -> TokenStream {
        match &self.attrs.crate_path {
            Some(path) => path.to_token_stream(),
            None => quote! { ::vc_serial },
        }
    }
}

fn parse_fields(fields: &Fields) -> syn::Result<Vec<StructField<'_>>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(Index {
                    index: index as u32,
                    span: field.span(),
                }),
            };
            Ok(StructField {
                member,
                ty: &field.ty,
                public: matches!(field.vis, Visibility::Public(_)),
                attrs: FieldAttributes::parse(&field.attrs)?,
            })
        })
        .collect()
}
