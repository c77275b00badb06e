use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use std::sync::{PoisonError, RwLock};

use crate::binder::TypeBinder;
use crate::binder::parse::{TypeName, parse};
use crate::debug::LOG_TARGET;
use crate::hash::HashMap;
use crate::info::{TypeInfo, crate_of};
use crate::registry::{ResolvedArg, TypeRegistry};

/// Names resolved against one registry generation, failures included.
#[derive(Default)]
struct NameCache {
    generation: u64,
    names: HashMap<String, Option<&'static TypeInfo>>,
}

/// Writes type paths and resolves them back with a cache.
///
/// The cache is dropped whenever the registry generation moves, so a type
/// registered after a failed lookup is found on the next attempt.
///
/// ```
/// use vc_serial::binder::{DefaultTypeBinder, TypeBinder};
/// use vc_serial::registry::TypeRegistry;
///
/// let mut types = TypeRegistry::new();
/// types.register::<Vec<[u8; 2]>>();
///
/// let binder = DefaultTypeBinder::new();
/// let info = binder.bind_to_type(&types, "alloc::vec::Vec< [u8;2] >").unwrap();
/// assert_eq!(binder.bind_to_name(info), "alloc::vec::Vec<[u8; 2]>");
/// ```
#[derive(Default)]
pub struct DefaultTypeBinder {
    cache: RwLock<NameCache>,
}

impl DefaultTypeBinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, types: &TypeRegistry, name: &str) -> Option<Option<&'static TypeInfo>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        if cache.generation != types.generation() {
            return None;
        }
        cache.names.get(name).copied()
    }

    fn remember(&self, types: &TypeRegistry, name: &str, info: Option<&'static TypeInfo>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.generation != types.generation() {
            cache.names.clear();
            cache.generation = types.generation();
        }
        cache.names.insert(String::from(name), info);
    }
}

impl TypeBinder for DefaultTypeBinder {
    #[inline]
    fn bind_to_name(&self, info: &'static TypeInfo) -> &'static str {
        info.type_path()
    }

    fn bind_to_type(&self, types: &TypeRegistry, name: &str) -> Option<&'static TypeInfo> {
        if let Some(found) = self.cached(types, name) {
            return found;
        }
        let found = resolve(types, name);
        if found.is_none() {
            log::debug!(target: LOG_TARGET, "no registered type is bound to `{name}`");
        }
        self.remember(types, name, found);
        found
    }
}

impl fmt::Debug for DefaultTypeBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DefaultTypeBinder")
            .field("generation", &cache.generation)
            .field("cached", &cache.names.len())
            .finish()
    }
}

fn resolve(types: &TypeRegistry, name: &str) -> Option<&'static TypeInfo> {
    types
        .get_with_former_path(name)
        .or_else(|| types.get_with_type_path(name))
        .or_else(|| resolve_parsed(types, &parse(name)?))
}

fn resolve_parsed(types: &TypeRegistry, name: &TypeName<'_>) -> Option<&'static TypeInfo> {
    match name {
        TypeName::Path(path) => types
            .get_with_former_path(path)
            .or_else(|| types.get_with_type_path(path))
            .or_else(|| search_crates(types, path)),
        TypeName::Generic { definition, args } => {
            let args = args
                .iter()
                .map(|arg| match arg {
                    TypeName::Const(value) => Some(ResolvedArg::Const(*value)),
                    other => resolve_parsed(types, other).map(ResolvedArg::Type),
                })
                .collect::<Option<Vec<_>>>()?;
            types
                .generic_instances(definition)
                .find(|info| TypeRegistry::generic_args_match(info, &args))
        }
        TypeName::Array { item, len } => {
            let item = resolve_parsed(types, item)?;
            types.array_of(item.type_id(), *len)
        }
        TypeName::Const(_) => None,
    }
}

/// Finds a type that moved: first a unique type of the same name inside
/// the named crate, then the same module path inside any other crate.
fn search_crates(types: &TypeRegistry, path: &str) -> Option<&'static TypeInfo> {
    let (krate, rest) = path.split_once("::")?;
    let short = rest.rsplit_once("::").map_or(rest, |(_, name)| name);

    let mut same_name = types
        .crate_types(krate)
        .filter(|info| info.type_name() == short);
    if let Some(found) = same_name.next()
        && same_name.next().is_none()
    {
        return Some(found);
    }

    types
        .crates()
        .filter(|other| *other != krate)
        .find_map(|other| {
            let candidate = alloc::format!("{other}::{rest}");
            types.get_with_type_path(&candidate)
        })
        .filter(|info| crate_of(info.type_path()) != krate)
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::*;
    use crate::info::Typed;

    fn binder_and_types() -> (DefaultTypeBinder, TypeRegistry) {
        let mut types = TypeRegistry::new();
        types.register::<Vec<Option<u8>>>();
        types.register::<[i16; 3]>();
        types.register::<std::collections::HashMap<String, Vec<i32>>>();
        (DefaultTypeBinder::new(), types)
    }

    fn id_of(info: Option<&'static TypeInfo>) -> Option<TypeId> {
        info.map(TypeInfo::type_id)
    }

    #[test]
    fn direct_and_structural_lookups() {
        let (binder, types) = binder_and_types();
        assert_eq!(
            id_of(binder.bind_to_type(&types, "alloc::vec::Vec<core::option::Option<u8>>")),
            Some(TypeId::of::<Vec<Option<u8>>>())
        );
        assert_eq!(
            id_of(binder.bind_to_type(&types, "[ i16 ;3 ]")),
            Some(TypeId::of::<[i16; 3]>())
        );
        assert_eq!(
            id_of(binder.bind_to_type(
                &types,
                "std::collections::HashMap<alloc::string::String,alloc::vec::Vec<i32>>"
            )),
            Some(TypeId::of::<std::collections::HashMap<String, Vec<i32>>>())
        );
    }

    #[test]
    fn spacing_inside_generic_names_is_ignored() {
        let (binder, mut types) = binder_and_types();
        types.register::<Vec<i32>>();
        assert_eq!(
            id_of(binder.bind_to_type(&types, "alloc::vec::Vec< i32 >")),
            Some(TypeId::of::<Vec<i32>>())
        );
        assert_eq!(
            id_of(binder.bind_to_type(
                &types,
                "alloc::vec::Vec< core::option::Option < u8 > >"
            )),
            Some(TypeId::of::<Vec<Option<u8>>>())
        );
    }

    #[test]
    fn instantiations_must_be_registered() {
        let (binder, types) = binder_and_types();
        assert!(binder.bind_to_type(&types, "alloc::vec::Vec<u64>").is_none());
        assert!(binder.bind_to_type(&types, "[i16; 4]").is_none());
    }

    #[test]
    fn former_paths_override() {
        let (binder, mut types) = binder_and_types();
        assert!(binder.bind_to_type(&types, "legacy::Bytes").is_none());
        types.add_former_path("legacy::Bytes", TypeId::of::<Vec<Option<u8>>>());
        assert_eq!(
            id_of(binder.bind_to_type(&types, "legacy::Bytes")),
            Some(TypeId::of::<Vec<Option<u8>>>())
        );
        // Former names also apply inside generic arguments.
        types.register::<Vec<Vec<Option<u8>>>>();
        assert_eq!(
            id_of(binder.bind_to_type(&types, "alloc::vec::Vec<legacy::Bytes>")),
            Some(TypeId::of::<Vec<Vec<Option<u8>>>>())
        );
    }

    #[test]
    fn negative_entries_expire_with_the_generation() {
        let (binder, mut types) = binder_and_types();
        assert!(binder.bind_to_type(&types, "alloc::vec::Vec<u64>").is_none());
        types.register::<Vec<u64>>();
        assert_eq!(
            id_of(binder.bind_to_type(&types, "alloc::vec::Vec<u64>")),
            Some(TypeId::of::<Vec<u64>>())
        );
    }

    #[test]
    fn moved_within_a_crate() {
        let (binder, types) = binder_and_types();
        assert_eq!(
            id_of(binder.bind_to_type(&types, "alloc::moved::String")),
            Some(TypeId::of::<String>())
        );
        // Generic definitions are never searched.
        assert!(
            binder
                .bind_to_type(&types, "alloc::old_vec::Vec<core::option::Option<u8>>")
                .is_none()
        );
    }

    #[test]
    fn names_are_type_paths() {
        let binder = DefaultTypeBinder::new();
        assert_eq!(binder.bind_to_name(<[u8; 2]>::type_info()), "[u8; 2]");
    }
}
