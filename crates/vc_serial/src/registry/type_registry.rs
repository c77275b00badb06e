use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::cell::RefCell;
use core::fmt;

use crate::hash::{HashMap, HashSet, TypeIdMap};
use crate::info::{GenericArg, PrimitiveKind, TypeInfo, TypeKind, Typed};
use crate::reflect::{InterfaceCast, Reflect, Shared, SharedObject, SharedTarget};

/// Converts a decoded value of one type into a value of another.
pub type Conversion =
    Arc<dyn Fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> + Send + Sync>;

// -----------------------------------------------------------------------------
// TypeMeta

/// Registration record of one type.
#[derive(Debug, Clone, Copy)]
pub struct TypeMeta {
    info: &'static TypeInfo,
}

impl TypeMeta {
    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.info.type_id()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.info.type_path()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistry

/// Every type the engine can name in a stream, plus the host-provided
/// relations between them: interface casts, conversions and renames.
///
/// Registering a type registers everything it refers to.
///
/// ```
/// use core::any::TypeId;
/// use vc_serial::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Vec<Option<u8>>>();
///
/// assert!(registry.contains(TypeId::of::<Option<u8>>()));
/// let info = registry.get_with_type_path("alloc::vec::Vec<core::option::Option<u8>>").unwrap();
/// assert_eq!(info.type_id(), TypeId::of::<Vec<Option<u8>>>());
/// ```
pub struct TypeRegistry {
    type_meta_table: TypeIdMap<TypeMeta>,
    type_path_to_id: HashMap<&'static str, TypeId>,
    type_name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
    // crate name -> registered types of that crate
    crates: HashMap<&'static str, Vec<TypeId>>,
    // generic definition path -> registered instantiations
    generic_instances: HashMap<&'static str, Vec<TypeId>>,
    // (item, len) -> `[item; len]`
    arrays: HashMap<(TypeId, usize), TypeId>,
    former_paths: HashMap<Cow<'static, str>, TypeId>,
    casts: HashMap<(TypeId, TypeId), Arc<dyn Any + Send + Sync>>,
    conversions: HashMap<(TypeId, TypeId), Conversion>,
    generation: u64,
}

impl Default for TypeRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            type_meta_table: TypeIdMap::default(),
            type_path_to_id: HashMap::default(),
            type_name_to_id: HashMap::default(),
            ambiguous_names: HashSet::default(),
            crates: HashMap::default(),
            generic_instances: HashMap::default(),
            arrays: HashMap::default(),
            former_paths: HashMap::default(),
            casts: HashMap::default(),
            conversions: HashMap::default(),
            generation: 0,
        }
    }

    /// Creates a registry holding every primitive type and `dyn Reflect`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in [
            PrimitiveKind::Bool,
            PrimitiveKind::I8,
            PrimitiveKind::U8,
            PrimitiveKind::I16,
            PrimitiveKind::U16,
            PrimitiveKind::I32,
            PrimitiveKind::U32,
            PrimitiveKind::I64,
            PrimitiveKind::U64,
            PrimitiveKind::Isize,
            PrimitiveKind::Usize,
            PrimitiveKind::F32,
            PrimitiveKind::F64,
            PrimitiveKind::Decimal,
            PrimitiveKind::Char,
            PrimitiveKind::String,
            PrimitiveKind::Guid,
        ] {
            registry.register_info(kind.type_info());
        }
        registry.register::<dyn Reflect>();
        registry
    }

    /// Registers `T` and every type it depends on.
    #[inline]
    pub fn register<T: Typed + ?Sized>(&mut self) {
        self.register_info(T::type_info());
    }

    /// Registers `info` and every type it depends on.
    ///
    /// Returns `false` if the type was already registered, in which case its
    /// dependencies are not visited again.
    pub fn register_info(&mut self, info: &'static TypeInfo) -> bool {
        let type_id = info.type_id();
        if self.type_meta_table.contains_key(&type_id) {
            return false;
        }
        self.type_meta_table.insert(type_id, TypeMeta { info });
        self.add_indices(info);
        self.generation += 1;

        info.for_each_dependency(|dep| {
            self.register_info(dep);
        });
        true
    }

    fn add_indices(&mut self, info: &'static TypeInfo) {
        let ty = info.ty();
        let type_id = ty.id();
        let name = ty.name();

        if !self.ambiguous_names.contains(name) {
            if self.type_name_to_id.contains_key(name) {
                self.type_name_to_id.remove(name);
                self.ambiguous_names.insert(name);
            } else {
                self.type_name_to_id.insert(name, type_id);
            }
        }
        self.type_path_to_id.insert(ty.path(), type_id);

        if let Some(krate) = ty.crate_name() {
            self.crates.entry(krate).or_default().push(type_id);
        }
        if let Some(generics) = info.generics() {
            self.generic_instances
                .entry(generics.definition())
                .or_default()
                .push(type_id);
        }
        if let TypeKind::Array(array) = info.kind() {
            self.arrays
                .insert((array.item().type_id(), array.len()), type_id);
        }
        for former in info.former_paths() {
            self.former_paths
                .entry(Cow::Borrowed(*former))
                .or_insert(type_id);
        }
    }

    /// Maps a name a type was written under in earlier builds to a
    /// registered type. Consulted by the binder before structural parsing.
    ///
    /// Returns `false` if `type_id` is not registered.
    pub fn add_former_path(&mut self, former: impl Into<Cow<'static, str>>, type_id: TypeId) -> bool {
        if !self.contains(type_id) {
            return false;
        }
        self.former_paths.insert(former.into(), type_id);
        self.generation += 1;
        true
    }

    /// Makes `C` assignable to the interface `I`.
    ///
    /// `upcast` is normally the identity closure `|rc| rc`, which performs the
    /// unsizing coercion.
    pub fn register_cast<C: Typed, I: SharedTarget + Typed + ?Sized>(
        &mut self,
        upcast: fn(Rc<RefCell<C>>) -> Rc<RefCell<I>>,
    ) {
        self.register::<C>();
        self.register::<I>();
        self.casts.insert(
            (TypeId::of::<C>(), TypeId::of::<I>()),
            Arc::new(InterfaceCast::<I>::new::<C>(upcast)),
        );
    }

    /// Upcasts an erased object to `Shared<I>` through a registered cast.
    pub fn cast_object<I: ?Sized + 'static>(
        &self,
        object: SharedObject,
    ) -> Result<Shared<I>, SharedObject> {
        let key = (object.type_info().type_id(), TypeId::of::<I>());
        let shared = self
            .casts
            .get(&key)
            .and_then(|cast| cast.downcast_ref::<InterfaceCast<I>>())
            .and_then(|cast| cast.apply(&object));
        shared.ok_or(object)
    }

    /// Registers an explicit conversion from values of `A` to values of `B`.
    pub fn register_conversion<A: Typed, B: Typed>(&mut self, convert: fn(A) -> B) {
        self.register::<A>();
        self.register::<B>();
        let conversion: Conversion = Arc::new(move |value: Box<dyn Reflect>| {
            value
                .take::<A>()
                .map(|a| Box::new(convert(a)) as Box<dyn Reflect>)
        });
        self.conversions
            .insert((TypeId::of::<A>(), TypeId::of::<B>()), conversion);
    }

    #[inline]
    pub fn conversion(&self, from: TypeId, to: TypeId) -> Option<&Conversion> {
        self.conversions.get(&(from, to))
    }

    /// Whether a value of type `from` may fill a slot declared as `to`.
    pub fn is_assignable(&self, from: &TypeInfo, to: &TypeInfo) -> bool {
        if from.type_id() == to.type_id() {
            return true;
        }
        match to.as_interface() {
            Some(interface) => {
                from.is_concrete()
                    && (interface.accepts_any_object()
                        || self.casts.contains_key(&(from.type_id(), to.type_id())))
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.type_meta_table.contains_key(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.type_meta_table.get(&type_id)
    }

    #[inline]
    pub fn get_type_info(&self, type_id: TypeId) -> Option<&'static TypeInfo> {
        self.get(type_id).map(TypeMeta::type_info)
    }

    pub fn get_with_type_path(&self, type_path: &str) -> Option<&'static TypeInfo> {
        match self.type_path_to_id.get(type_path) {
            Some(id) => self.get_type_info(*id),
            None => None,
        }
    }

    /// Looks a type up by its short name; `None` if the name is ambiguous.
    pub fn get_with_type_name(&self, type_name: &str) -> Option<&'static TypeInfo> {
        match self.type_name_to_id.get(type_name) {
            Some(id) => self.get_type_info(*id),
            None => None,
        }
    }

    #[inline]
    pub fn is_ambiguous(&self, type_name: &str) -> bool {
        self.ambiguous_names.contains(type_name)
    }

    /// The type registered under a former path.
    pub fn get_with_former_path(&self, former: &str) -> Option<&'static TypeInfo> {
        match self.former_paths.get(former) {
            Some(id) => self.get_type_info(*id),
            None => None,
        }
    }

    /// Registered instantiations of a generic definition such as
    /// `alloc::vec::Vec`.
    pub fn generic_instances(&self, definition: &str) -> impl Iterator<Item = &'static TypeInfo> + '_ {
        self.generic_instances
            .get(definition)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_type_info(*id))
    }

    /// The registered `[item; len]`.
    pub fn array_of(&self, item: TypeId, len: usize) -> Option<&'static TypeInfo> {
        self.arrays
            .get(&(item, len))
            .and_then(|id| self.get_type_info(*id))
    }

    /// Types whose path starts with `krate::`.
    pub fn crate_types(&self, krate: &str) -> impl Iterator<Item = &'static TypeInfo> + '_ {
        self.crates
            .get(krate)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_type_info(*id))
    }

    /// Names of every crate with a registered type.
    pub fn crates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.crates.keys().copied()
    }

    /// Bumped whenever a type or a former path is added.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeMeta> {
        self.type_meta_table.values()
    }

    /// Whether every generic argument of `info` is one of `args`, in order.
    pub(crate) fn generic_args_match(info: &TypeInfo, args: &[ResolvedArg]) -> bool {
        let Some(generics) = info.generics() else {
            return false;
        };
        generics.args().len() == args.len()
            && generics.args().iter().zip(args).all(|(arg, resolved)| {
                match (arg, resolved) {
                    (GenericArg::Type(f), ResolvedArg::Type(info)) => {
                        TypeInfo::type_id(f()) == TypeInfo::type_id(info)
                    }
                    (GenericArg::Const(a), ResolvedArg::Const(b)) => a == b,
                    _ => false,
                }
            })
    }
}

/// A generic argument after name resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResolvedArg {
    Type(&'static TypeInfo),
    Const(u64),
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.type_path_to_id.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::any::TypeId;

    use super::*;

    #[test]
    fn primitives_are_preregistered() {
        let registry = TypeRegistry::new();
        assert!(registry.contains(TypeId::of::<u64>()));
        assert!(registry.contains(TypeId::of::<String>()));
        assert!(registry.get_with_type_path("vc_serial::reflect::Reflect").is_some());
    }

    #[test]
    fn indices_for_generics_and_arrays() {
        let mut registry = TypeRegistry::new();
        registry.register::<[u8; 4]>();
        registry.register::<Vec<i32>>();
        registry.register::<Vec<u8>>();

        assert_eq!(
            registry.array_of(TypeId::of::<u8>(), 4).map(TypeInfo::type_id),
            Some(TypeId::of::<[u8; 4]>())
        );
        assert_eq!(registry.generic_instances("alloc::vec::Vec").count(), 2);
        assert!(registry.crate_types("alloc").any(|t| t.type_id() == TypeId::of::<Vec<u8>>()));
    }

    #[test]
    fn former_paths_need_registered_target() {
        let mut registry = TypeRegistry::new();
        assert!(!registry.add_former_path("old::Bytes", TypeId::of::<Vec<u8>>()));
        registry.register::<Vec<u8>>();
        let generation = registry.generation();
        assert!(registry.add_former_path("old::Bytes", TypeId::of::<Vec<u8>>()));
        assert!(registry.generation() > generation);
        assert_eq!(
            registry.get_with_former_path("old::Bytes").map(TypeInfo::type_id),
            Some(TypeId::of::<Vec<u8>>())
        );
    }

    #[test]
    fn generic_arguments_compare_by_type() {
        let vec_i32 = <Vec<i32>>::type_info();
        assert!(TypeRegistry::generic_args_match(
            vec_i32,
            &[ResolvedArg::Type(i32::type_info())]
        ));
        assert!(!TypeRegistry::generic_args_match(
            vec_i32,
            &[ResolvedArg::Type(u32::type_info())]
        ));
        assert!(!TypeRegistry::generic_args_match(vec_i32, &[]));
        assert!(!TypeRegistry::generic_args_match(
            <[u8; 2]>::type_info(),
            &[ResolvedArg::Const(2)]
        ));
    }

    #[test]
    fn conversions() {
        let mut registry = TypeRegistry::new();
        registry.register_conversion::<i32, i64>(i64::from);
        let convert = registry
            .conversion(TypeId::of::<i32>(), TypeId::of::<i64>())
            .unwrap();
        let out = convert(Box::new(7i32)).unwrap();
        assert_eq!(out.downcast_ref::<i64>(), Some(&7));
        assert!(convert(Box::new(7u8)).is_err());
    }

    #[test]
    fn assignability() {
        let registry = TypeRegistry::new();
        let any = <dyn Reflect as Typed>::type_info();
        assert!(registry.is_assignable(u8::type_info(), any));
        assert!(registry.is_assignable(u8::type_info(), u8::type_info()));
        assert!(!registry.is_assignable(u8::type_info(), i8::type_info()));
        assert!(!registry.is_assignable(any, u8::type_info()));
    }
}
