use proc_macro2::TokenStream;
use quote::quote;
use syn::ExprPath;

use crate::derive_data::{EnumVariant, ReflectData, ReflectDerive, StructField};

pub(crate) fn impl_reflect(derive: &ReflectDerive) -> TokenStream {
    let type_path = impl_type_path(derive);
    let typed = impl_typed(derive);
    let auto_register = impl_auto_register(derive);
    quote! {
        #type_path
        #typed
        #auto_register
    }
}

// -----------------------------------------------------------------------------
// TypePath

fn impl_type_path(derive: &ReflectDerive) -> TokenStream {
    let vc = derive.crate_path();
    let ident = derive.ident;
    let ident_str = ident.to_string();

    let (type_path, type_name, module_path) = match &derive.attrs.type_path {
        Some(lit) => {
            let value = lit.value();
            let (module, name) = match value.rsplit_once("::") {
                Some((module, name)) => (Some(module.to_owned()), name.to_owned()),
                None => (None, value.clone()),
            };
            let module = match module {
                Some(module) => quote! { ::core::option::Option::Some(#module) },
                None => quote! { ::core::option::Option::None },
            };
            (quote! { #value }, quote! { #name }, module)
        }
        None => (
            quote! { ::core::concat!(::core::module_path!(), "::", #ident_str) },
            quote! { #ident_str },
            quote! { ::core::option::Option::Some(::core::module_path!()) },
        ),
    };

    quote! {
        impl #vc::info::TypePath for #ident {
            #[inline]
            fn type_path() -> &'static str {
                #type_path
            }

            #[inline]
            fn type_name() -> &'static str {
                #type_name
            }

            #[inline]
            fn module_path() -> ::core::option::Option<&'static str> {
                #module_path
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Typed

fn impl_typed(derive: &ReflectDerive) -> TokenStream {
    let vc = derive.crate_path();
    let ident = derive.ident;

    let kind = match &derive.data {
        ReflectData::Struct(fields) => struct_kind(derive, fields),
        ReflectData::Enum(variants) => enum_kind(derive, variants),
    };

    let default = match derive.attrs.no_default {
        Some(_) => quote! {},
        None => quote! { .with_default::<Self>() },
    };
    let former_paths = match derive.attrs.former_paths.as_slice() {
        [] => quote! {},
        paths => quote! { .with_former_paths(&[#(#paths),*]) },
    };
    let serializable = match derive.attrs.not_serializable {
        Some(_) => quote! { .with_serializable(false) },
        None => quote! {},
    };

    quote! {
        impl #vc::info::Typed for #ident {
            fn type_info() -> &'static #vc::info::TypeInfo {
                static CELL: #vc::info::NonGenericTypeInfoCell = #vc::info::NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| {
                    #vc::info::TypeInfo::new::<Self>(#kind)
                        #default
                        #former_paths
                        #serializable
                })
            }
        }
    }
}

fn struct_kind(derive: &ReflectDerive, fields: &[StructField]) -> TokenStream {
    let vc = derive.crate_path();
    let fields = fields.iter().map(|field| {
        let name = field.name();
        let member = &field.member;
        let ty = field.ty;
        let public = field.public;
        let serialize = field.attrs.serialize;
        let skip = field.attrs.skip;
        let former_names = match field.attrs.former_names.as_slice() {
            [] => quote! {},
            names => quote! { .with_former_names(&[#(#names),*]) },
        };
        quote! {
            #vc::info::FieldInfo::new::<#ty>(
                #name,
                |owner| {
                    owner
                        .downcast_ref::<Self>()
                        .map(|owner| &owner.#member as &dyn #vc::reflect::Reflect)
                },
                |owner, value| {
                    let ::core::option::Option::Some(owner) = owner.downcast_mut::<Self>() else {
                        return ::core::result::Result::Err(value);
                    };
                    owner.#member = value.take::<#ty>()?;
                    ::core::result::Result::Ok(())
                },
            )
            .with_attributes(#vc::info::FieldAttributes {
                public: #public,
                serialize: #serialize,
                skip: #skip,
            })
            #former_names
        }
    });

    let hooks = &derive.attrs.hooks;
    let before_serialize = serialize_hook(derive, hooks.before_serialize.as_ref());
    let after_serialize = serialize_hook(derive, hooks.after_serialize.as_ref());
    let before_deserialize = deserialize_hook(derive, hooks.before_deserialize.as_ref());
    let after_deserialize = deserialize_hook(derive, hooks.after_deserialize.as_ref());

    quote! {
        #vc::info::TypeKind::Struct(
            #vc::info::StructInfo::new(::std::vec![#(#fields),*]).with_hooks(#vc::info::LifecycleHooks {
                before_serialize: #before_serialize,
                after_serialize: #after_serialize,
                before_deserialize: #before_deserialize,
                after_deserialize: #after_deserialize,
            })
        )
    }
}

/// Adapts a `fn(&Self) -> Result<(), HookError>` to the erased hook type.
fn serialize_hook(derive: &ReflectDerive, hook: Option<&ExprPath>) -> TokenStream {
    let vc = derive.crate_path();
    match hook {
        Some(hook) => quote! {
            ::core::option::Option::Some(|value: &dyn #vc::reflect::Reflect| {
                match value.downcast_ref::<Self>() {
                    ::core::option::Option::Some(value) => #hook(value),
                    ::core::option::Option::None => ::core::result::Result::Ok(()),
                }
            })
        },
        None => quote! { ::core::option::Option::None },
    }
}

/// Adapts a `fn(&mut Self) -> Result<(), HookError>` to the erased hook type.
fn deserialize_hook(derive: &ReflectDerive, hook: Option<&ExprPath>) -> TokenStream {
    let vc = derive.crate_path();
    match hook {
        Some(hook) => quote! {
            ::core::option::Option::Some(|value: &mut dyn #vc::reflect::Reflect| {
                match value.downcast_mut::<Self>() {
                    ::core::option::Option::Some(value) => #hook(value),
                    ::core::option::Option::None => ::core::result::Result::Ok(()),
                }
            })
        },
        None => quote! { ::core::option::Option::None },
    }
}

fn enum_kind(derive: &ReflectDerive, variants: &[EnumVariant]) -> TokenStream {
    let vc = derive.crate_path();
    let idents: Vec<_> = variants.iter().map(|v| v.ident).collect();
    let names: Vec<_> = idents.iter().map(|ident| ident.to_string()).collect();
    let discriminants: Vec<_> = variants.iter().map(|v| &v.discriminant).collect();

    quote! {
        #vc::info::TypeKind::Enum(#vc::info::EnumInfo::new(
            ::std::vec![#(
                #vc::info::VariantInfo { name: #names, discriminant: #discriminants }
            ),*],
            |value| {
                value.downcast_ref::<Self>().map(|value| match value {
                    #(Self::#idents => #discriminants,)*
                })
            },
            |discriminant| {
                #(
                    if discriminant == #discriminants {
                        return ::core::option::Option::Some(
                            ::std::boxed::Box::new(Self::#idents) as ::std::boxed::Box<dyn #vc::reflect::Reflect>
                        );
                    }
                )*
                ::core::option::Option::None
            },
        ))
    }
}

// -----------------------------------------------------------------------------
// auto_register

#[cfg(feature = "auto_register")]
fn impl_auto_register(derive: &ReflectDerive) -> TokenStream {
    if derive.attrs.auto_register.is_none() {
        return quote! {};
    }
    let vc = derive.crate_path();
    let ident = derive.ident;
    let ident_str = ident.to_string();
    quote! {
        const _: () = {
            fn register(types: &mut #vc::registry::TypeRegistry) {
                types.register::<#ident>();
            }
            #vc::register_module!(::core::concat!(::core::module_path!(), "::", #ident_str), register);
        };
    }
}

#[cfg(not(feature = "auto_register"))]
fn impl_auto_register(_: &ReflectDerive) -> TokenStream {
    quote! {}
}
