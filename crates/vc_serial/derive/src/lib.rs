//! `#[derive(Reflect)]` for `vc_serial`.
//!
//! Generates `TypePath` and `Typed` (and with them `Reflect`) for named
//! structs, tuple structs, unit structs and field-less enums.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static REFLECT_ATTRIBUTE_NAME: &str = "reflect";

mod attributes;
mod derive_data;
mod impls;

/// # Reflection Derivation
///
/// `#[derive(Reflect)]` implements `TypePath` and `Typed`; `Reflect` follows
/// from the blanket impl over `Typed`.
///
/// The type must implement `Default` unless it is marked `no_default`,
/// every field type must implement `Typed`, and generic types are not
/// supported.
///
/// ## Type attributes
///
/// ```rust, ignore
/// #[derive(Reflect, Default)]
/// #[reflect(type_path = "shapes::Circle")]       // pin the stream name
/// #[reflect(former_path = "old_shapes::Circle")] // accept an old name, repeatable
/// #[reflect(not_serializable)]                   // only written under permissive policies
/// #[reflect(no_default)]                         // no default instances
/// #[reflect(auto_register)]                      // register at link time
/// #[reflect(before_serialize = Circle::check)]   // fn(&Self) -> Result<(), HookError>
/// #[reflect(after_deserialize = Circle::fix)]    // fn(&mut Self) -> Result<(), HookError>
/// #[reflect(crate = my_engine::serial)]          // path of the vc_serial crate
/// struct Circle { /* ... */ }
/// ```
///
/// The four hooks are `before_serialize`, `after_serialize`,
/// `before_deserialize` and `after_deserialize`.
///
/// ## Field attributes
///
/// ```rust, ignore
/// struct Circle {
///     #[reflect(serialize)]              // written even though private
///     radius: f32,
///     #[reflect(skip)]                   // never written
///     pub cache: u64,
///     #[reflect(former_name = "center")] // accept an old name, repeatable
///     pub origin: (f32, f32),
/// }
/// ```
///
/// Which fields are written is decided by the active serialization policy;
/// the attributes only mark them.
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let derive = match derive_data::ReflectDerive::from_input(&ast) {
        Ok(derive) => derive,
        Err(err) => return err.into_compile_error().into(),
    };

    impls::impl_reflect(&derive).into()
}
