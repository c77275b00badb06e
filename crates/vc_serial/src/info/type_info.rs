use alloc::boxed::Box;
use core::any::TypeId;

use crate::info::{
    ArrayInfo, EnumInfo, ListInfo, MapInfo, OptionInfo, PrimitiveKind, SharedInfo, StructInfo,
    Type, TypePath, Typed,
};
use crate::reflect::{Reflect, SharedObject};

/// Static description of one Rust type, as seen by the serializer.
///
/// Every reference to another type is a lazy `fn() -> &'static TypeInfo`
/// so recursive types can describe themselves.
#[derive(Debug)]
pub struct TypeInfo {
    ty: Type,
    kind: TypeKind,
    generics: Option<GenericInfo>,
    former_paths: &'static [&'static str],
    serializable: bool,
    create: Option<fn() -> Box<dyn Reflect>>,
    create_shared: Option<fn() -> SharedObject>,
    wrap_shared: Option<fn(Box<dyn Reflect>) -> Result<SharedObject, Box<dyn Reflect>>>,
    assign: Option<fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>>,
}

/// Shape specific part of a [`TypeInfo`].
#[derive(Debug)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Struct(StructInfo),
    Enum(EnumInfo),
    List(ListInfo),
    Array(ArrayInfo),
    Map(MapInfo),
    Option(OptionInfo),
    Shared(SharedInfo),
    Interface(InterfaceInfo),
}

/// An abstract target of a [`Shared`](crate::reflect::Shared) handle.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceInfo {
    any_object: bool,
}

impl InterfaceInfo {
    /// Whether every registered type is assignable to this interface.
    #[inline]
    pub fn accepts_any_object(&self) -> bool {
        self.any_object
    }
}

/// One argument of a generic instantiation.
#[derive(Debug, Clone, Copy)]
pub enum GenericArg {
    Type(fn() -> &'static TypeInfo),
    Const(u64),
}

/// Generic definition path plus the arguments of one instantiation.
///
/// The binder reconstructs `Def<A, B>` names by matching these against
/// the registered instantiations.
#[derive(Debug)]
pub struct GenericInfo {
    definition: &'static str,
    args: Box<[GenericArg]>,
}

impl GenericInfo {
    pub fn new(definition: &'static str, args: impl Into<Box<[GenericArg]>>) -> Self {
        Self {
            definition,
            args: args.into(),
        }
    }

    #[inline]
    pub fn definition(&self) -> &'static str {
        self.definition
    }

    #[inline]
    pub fn args(&self) -> &[GenericArg] {
        &self.args
    }
}

fn wrap_shared<T: Typed>(value: Box<dyn Reflect>) -> Result<SharedObject, Box<dyn Reflect>> {
    value.take::<T>().map(SharedObject::new)
}

fn assign<T: Typed>(target: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
    match target.downcast_mut::<T>() {
        Some(target) => {
            *target = value.take::<T>()?;
            Ok(())
        }
        None => Err(value),
    }
}

impl TypeInfo {
    /// Creates the info of a sized type.
    pub fn new<T: Typed>(kind: TypeKind) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind,
            generics: None,
            former_paths: &[],
            serializable: true,
            create: None,
            create_shared: None,
            wrap_shared: Some(wrap_shared::<T>),
            assign: Some(assign::<T>),
        }
    }

    /// Creates the info of an abstract handle target such as `dyn Reflect`.
    pub fn interface<T: TypePath + ?Sized>(any_object: bool) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: TypeKind::Interface(InterfaceInfo { any_object }),
            generics: None,
            former_paths: &[],
            serializable: true,
            create: None,
            create_shared: None,
            wrap_shared: None,
            assign: None,
        }
    }

    /// Enables creating default instances of `T`.
    pub fn with_default<T: Typed + Default>(mut self) -> Self {
        debug_assert!(self.ty.is::<T>());
        self.create = Some(|| -> Box<dyn Reflect> { Box::new(T::default()) });
        self.create_shared = Some(|| SharedObject::new(T::default()));
        self
    }

    /// Custom constructors, for types without a `Default` impl.
    pub fn with_create_fns(
        mut self,
        create: fn() -> Box<dyn Reflect>,
        create_shared: fn() -> SharedObject,
    ) -> Self {
        self.create = Some(create);
        self.create_shared = Some(create_shared);
        self
    }

    pub fn with_generics(mut self, generics: GenericInfo) -> Self {
        self.generics = Some(generics);
        self
    }

    /// Paths this type was known under in earlier builds.
    pub fn with_former_paths(mut self, paths: &'static [&'static str]) -> Self {
        self.former_paths = paths;
        self
    }

    pub fn with_serializable(mut self, serializable: bool) -> Self {
        self.serializable = serializable;
        self
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.ty.path()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    #[inline]
    pub fn generics(&self) -> Option<&GenericInfo> {
        self.generics.as_ref()
    }

    #[inline]
    pub fn former_paths(&self) -> &'static [&'static str] {
        self.former_paths
    }

    #[inline]
    pub fn is_serializable(&self) -> bool {
        self.serializable
    }

    /// `false` for interfaces, which have no instances of their own.
    #[inline]
    pub fn is_concrete(&self) -> bool {
        !matches!(self.kind, TypeKind::Interface(_))
    }

    /// A default instance, if the type has one.
    pub fn create_value(&self) -> Option<Box<dyn Reflect>> {
        self.create.map(|f| f())
    }

    /// A default instance in a fresh shared allocation.
    pub fn create_shared(&self) -> Option<SharedObject> {
        self.create_shared.map(|f| f())
    }

    /// Moves a value of this type into a fresh shared allocation.
    pub fn wrap_shared(&self, value: Box<dyn Reflect>) -> Result<SharedObject, Box<dyn Reflect>> {
        match self.wrap_shared {
            Some(f) => f(value),
            None => Err(value),
        }
    }

    /// Overwrites `target`, a value of this type, with `value`.
    ///
    /// Hands `value` back if either side is of another type.
    pub fn assign(&self, target: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        match self.assign {
            Some(f) => f(target, value),
            None => Err(value),
        }
    }

    #[inline]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.kind {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    #[inline]
    pub fn as_struct(&self) -> Option<&StructInfo> {
        match &self.kind {
            TypeKind::Struct(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match &self.kind {
            TypeKind::Enum(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&ListInfo> {
        match &self.kind {
            TypeKind::List(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&ArrayInfo> {
        match &self.kind {
            TypeKind::Array(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&MapInfo> {
        match &self.kind {
            TypeKind::Map(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_option(&self) -> Option<&OptionInfo> {
        match &self.kind {
            TypeKind::Option(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_shared(&self) -> Option<&SharedInfo> {
        match &self.kind {
            TypeKind::Shared(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn as_interface(&self) -> Option<&InterfaceInfo> {
        match &self.kind {
            TypeKind::Interface(info) => Some(info),
            _ => None,
        }
    }

    /// Calls `f` with every type this one refers to directly.
    pub fn for_each_dependency(&self, mut f: impl FnMut(&'static TypeInfo)) {
        match &self.kind {
            TypeKind::Primitive(_) | TypeKind::Enum(_) | TypeKind::Interface(_) => {}
            TypeKind::Struct(info) => info.fields().iter().for_each(|v| f(v.type_info())),
            TypeKind::List(info) => f(info.item()),
            TypeKind::Array(info) => f(info.item()),
            TypeKind::Map(info) => {
                f(info.key());
                f(info.value());
            }
            TypeKind::Option(info) => f(info.some()),
            TypeKind::Shared(info) => f(info.target()),
        }
        if let Some(generics) = &self.generics {
            for arg in generics.args() {
                if let GenericArg::Type(arg) = arg {
                    f(arg());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Shared;

    #[test]
    fn primitive_info() {
        let info = i64::type_info();
        assert!(info.is_concrete());
        assert_eq!(info.as_primitive(), Some(PrimitiveKind::I64));
        let value = info.create_value().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&0));
    }

    #[test]
    fn interface_has_no_instances() {
        let info = <dyn Reflect as Typed>::type_info();
        assert!(!info.is_concrete());
        assert!(info.create_value().is_none());
        assert!(info.as_interface().unwrap().accepts_any_object());
    }

    #[test]
    fn wrap_shared_checks_type() {
        let info = u8::type_info();
        let obj = info.wrap_shared(Box::new(7u8)).unwrap();
        assert_eq!(*obj.downcast::<u8>().unwrap().borrow(), 7);
        assert!(info.wrap_shared(Box::new(7u16)).is_err());
    }

    #[test]
    fn assign_in_place() {
        let info = String::type_info();
        let mut target: Box<dyn Reflect> = Box::new(String::from("old"));
        info.assign(&mut *target, Box::new(String::from("new"))).unwrap();
        assert_eq!(target.downcast_ref::<String>().map(String::as_str), Some("new"));
        assert!(info.assign(&mut *target, Box::new(1_u8)).is_err());
    }

    #[test]
    fn dependencies_of_generic_container() {
        let mut deps = alloc::vec::Vec::new();
        <Vec<Shared<String>>>::type_info().for_each_dependency(|d| deps.push(d.type_path()));
        assert!(deps.contains(&"vc_serial::Shared<alloc::string::String>"));
    }
}
