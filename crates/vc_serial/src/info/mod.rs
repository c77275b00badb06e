//! Static type information.
//!
//! - [`TypePath`]: stable names, the input of the binder.
//! - [`Typed`]: access to a type's [`TypeInfo`] without an instance.
//! - [`TypeInfo`] / [`TypeKind`]: the shape the dispatchers and formatters
//!   walk, one info per kind ([`StructInfo`], [`ListInfo`], [`SharedInfo`], ...).

mod cell;
mod container_info;
mod enum_info;
mod primitive;
mod shared_info;
mod struct_info;
mod type_info;
mod type_path;

pub use cell::{GenericTypeInfoCell, GenericTypePathCell, NonGenericTypeInfoCell, concat};
pub use container_info::{
    ArrayInfo, ForEachEntry, ForEachItem, ListInfo, MapInfo, OptionInfo, PrimitiveListAccess,
};
pub use enum_info::{EnumInfo, VariantInfo};
pub use primitive::PrimitiveKind;
pub use shared_info::{SharedInfo, SharedView};
pub use struct_info::{
    DeserializeHook, FieldAttributes, FieldGetter, FieldInfo, FieldSetter, LifecycleHooks,
    SerializeHook, StructInfo,
};
pub use type_info::{GenericArg, GenericInfo, InterfaceInfo, TypeInfo, TypeKind};
pub use type_path::{Type, TypePath, crate_of};

/// A static accessor to compile-time type information.
///
/// Implemented by `#[derive(Reflect)]`, by the built-in impls for
/// primitives and containers, and by [`impl_shared_interface!`] for
/// interface targets.
///
/// [`impl_shared_interface!`]: crate::impl_shared_interface
pub trait Typed: TypePath {
    fn type_info() -> &'static TypeInfo;
}
