use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::string::ToString;
use alloc::vec::Vec;
use core::any::Any;
use core::hash::Hash;
use std::collections::{HashMap, HashSet};

use crate::error::SerialResult;
use crate::format::PrimitiveSlice;
use crate::info::{
    ArrayInfo, GenericArg, GenericInfo, GenericTypeInfoCell, GenericTypePathCell, ListInfo,
    MapInfo, OptionInfo, PrimitiveKind, PrimitiveListAccess, TypeInfo, TypeKind, TypePath, Typed,
    concat,
};
use crate::reflect::{Reflect, SharedObject};

// -----------------------------------------------------------------------------
// Lists

trait ListLike: Typed + Default {
    type Item: Typed;

    fn count(&self) -> usize;
    fn items(&self) -> impl Iterator<Item = &Self::Item>;
    fn push_item(&mut self, item: Self::Item);
    fn clear_items(&mut self);
}

fn list_len<L: ListLike>(list: &dyn Reflect) -> usize {
    list.downcast_ref::<L>().map_or(0, L::count)
}

fn list_for_each<L: ListLike>(
    list: &dyn Reflect,
    f: &mut dyn FnMut(&dyn Reflect) -> SerialResult<()>,
) -> SerialResult<()> {
    if let Some(list) = list.downcast_ref::<L>() {
        for item in list.items() {
            f(item)?;
        }
    }
    Ok(())
}

fn list_push<L: ListLike>(list: &mut dyn Reflect, item: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
    let Some(list) = list.downcast_mut::<L>() else {
        return Err(item);
    };
    list.push_item(item.take::<L::Item>()?);
    Ok(())
}

fn list_clear<L: ListLike>(list: &mut dyn Reflect) {
    if let Some(list) = list.downcast_mut::<L>() {
        list.clear_items();
    }
}

fn list_info<L: ListLike>() -> ListInfo {
    ListInfo::new(
        L::Item::type_info,
        list_len::<L>,
        list_for_each::<L>,
        list_push::<L>,
        list_clear::<L>,
    )
}

fn vec_primitive_access<T: 'static>() -> Option<PrimitiveListAccess> {
    let kind = PrimitiveKind::of::<T>()?;
    kind.stride()?;
    Some(PrimitiveListAccess {
        kind,
        as_slice: |list| PrimitiveSlice::from_vec(list as &dyn Any),
        assign: |list, array| array.assign_to_vec(list as &mut dyn Any),
    })
}

macro_rules! impl_list {
    ($ty:ident < T $(: $bound:path)* >, $def:literal, $module:literal, $push:ident) => {
        impl<T: Typed $(+ $bound)*> ListLike for $ty<T> {
            type Item = T;

            #[inline]
            fn count(&self) -> usize {
                self.len()
            }

            fn items(&self) -> impl Iterator<Item = &T> {
                self.iter()
            }

            fn push_item(&mut self, item: T) {
                self.$push(item);
            }

            fn clear_items(&mut self) {
                self.clear();
            }
        }

        impl<T: Typed $(+ $bound)*> TypePath for $ty<T> {
            fn type_path() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| concat(&[$def, "<", T::type_path(), ">"]))
            }

            fn type_name() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| concat(&[stringify!($ty), "<", T::type_name(), ">"]))
            }

            fn module_path() -> Option<&'static str> {
                Some($module)
            }
        }
    };
}

impl_list!(Vec<T>, "alloc::vec::Vec", "alloc::vec", push);
impl_list!(VecDeque<T>, "alloc::collections::VecDeque", "alloc::collections", push_back);
impl_list!(BTreeSet<T: Ord>, "alloc::collections::BTreeSet", "alloc::collections", insert);
impl_list!(HashSet<T: Eq: Hash>, "std::collections::HashSet", "std::collections", insert);

impl<T: Typed> Typed for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            let info = list_info::<Self>().with_primitive_access(vec_primitive_access::<T>());
            TypeInfo::new::<Self>(TypeKind::List(info))
                .with_default::<Self>()
                .with_generics(GenericInfo::new(
                    "alloc::vec::Vec",
                    [GenericArg::Type(T::type_info)],
                ))
        })
    }
}

macro_rules! impl_typed_list {
    ($ty:ident < T $(: $bound:path)* >, $def:literal) => {
        impl<T: Typed $(+ $bound)*> Typed for $ty<T> {
            fn type_info() -> &'static TypeInfo {
                static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
                CELL.get_or_insert::<Self>(|| {
                    TypeInfo::new::<Self>(TypeKind::List(list_info::<Self>()))
                        .with_default::<Self>()
                        .with_generics(GenericInfo::new($def, [GenericArg::Type(T::type_info)]))
                })
            }
        }
    };
}

impl_typed_list!(VecDeque<T>, "alloc::collections::VecDeque");
impl_typed_list!(BTreeSet<T: Ord>, "alloc::collections::BTreeSet");
impl_typed_list!(HashSet<T: Eq: Hash>, "std::collections::HashSet");

// -----------------------------------------------------------------------------
// Maps

trait MapLike: Typed + Default {
    type Key: Typed;
    type Value: Typed;

    fn count(&self) -> usize;
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
    fn clear_entries(&mut self);
}

fn map_len<M: MapLike>(map: &dyn Reflect) -> usize {
    map.downcast_ref::<M>().map_or(0, M::count)
}

fn map_for_each<M: MapLike>(
    map: &dyn Reflect,
    f: &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> SerialResult<()>,
) -> SerialResult<()> {
    if let Some(map) = map.downcast_ref::<M>() {
        for (key, value) in map.entries() {
            f(key, value)?;
        }
    }
    Ok(())
}

fn map_insert<M: MapLike>(
    map: &mut dyn Reflect,
    key: Box<dyn Reflect>,
    value: Box<dyn Reflect>,
) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)> {
    let Some(map) = map.downcast_mut::<M>() else {
        return Err((key, value));
    };
    let key = match key.take::<M::Key>() {
        Ok(key) => key,
        Err(key) => return Err((key, value)),
    };
    let value = match value.take::<M::Value>() {
        Ok(value) => value,
        Err(value) => return Err((Box::new(key) as Box<dyn Reflect>, value)),
    };
    map.insert_entry(key, value);
    Ok(())
}

fn map_clear<M: MapLike>(map: &mut dyn Reflect) {
    if let Some(map) = map.downcast_mut::<M>() {
        map.clear_entries();
    }
}

macro_rules! impl_map {
    ($ty:ident < K $(: $bound:path)*, V >, $def:literal, $module:literal) => {
        impl<K: Typed $(+ $bound)*, V: Typed> MapLike for $ty<K, V> {
            type Key = K;
            type Value = V;

            #[inline]
            fn count(&self) -> usize {
                self.len()
            }

            fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
                self.iter()
            }

            fn insert_entry(&mut self, key: K, value: V) {
                self.insert(key, value);
            }

            fn clear_entries(&mut self) {
                self.clear();
            }
        }

        impl<K: Typed $(+ $bound)*, V: Typed> TypePath for $ty<K, V> {
            fn type_path() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[$def, "<", K::type_path(), ", ", V::type_path(), ">"])
                })
            }

            fn type_name() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[stringify!($ty), "<", K::type_name(), ", ", V::type_name(), ">"])
                })
            }

            fn module_path() -> Option<&'static str> {
                Some($module)
            }
        }

        impl<K: Typed $(+ $bound)*, V: Typed> Typed for $ty<K, V> {
            fn type_info() -> &'static TypeInfo {
                static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
                CELL.get_or_insert::<Self>(|| {
                    let info = MapInfo::new(
                        K::type_info,
                        V::type_info,
                        map_len::<Self>,
                        map_for_each::<Self>,
                        map_insert::<Self>,
                        map_clear::<Self>,
                    );
                    TypeInfo::new::<Self>(TypeKind::Map(info))
                        .with_default::<Self>()
                        .with_generics(GenericInfo::new(
                            $def,
                            [GenericArg::Type(K::type_info), GenericArg::Type(V::type_info)],
                        ))
                })
            }
        }
    };
}

impl_map!(BTreeMap<K: Ord, V>, "alloc::collections::BTreeMap", "alloc::collections");
impl_map!(HashMap<K: Eq: Hash, V>, "std::collections::HashMap", "std::collections");

// -----------------------------------------------------------------------------
// Option

fn option_get<T: Typed>(option: &dyn Reflect) -> Option<&dyn Reflect> {
    option
        .downcast_ref::<Option<T>>()?
        .as_ref()
        .map(|v| v as &dyn Reflect)
}

fn option_wrap_some<T: Typed>(value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> {
    value
        .take::<T>()
        .map(|v| Box::new(Some(v)) as Box<dyn Reflect>)
}

fn option_none<T: Typed>() -> Box<dyn Reflect> {
    Box::new(None::<T>)
}

impl<T: Typed> TypePath for Option<T> {
    fn type_path() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["core::option::Option<", T::type_path(), ">"]))
    }

    fn type_name() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["Option<", T::type_name(), ">"]))
    }

    fn module_path() -> Option<&'static str> {
        Some("core::option")
    }
}

impl<T: Typed> Typed for Option<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            let info = OptionInfo::new(
                T::type_info,
                option_get::<T>,
                option_wrap_some::<T>,
                option_none::<T>,
            );
            TypeInfo::new::<Self>(TypeKind::Option(info))
                .with_default::<Self>()
                .with_generics(GenericInfo::new(
                    "core::option::Option",
                    [GenericArg::Type(T::type_info)],
                ))
        })
    }
}

// -----------------------------------------------------------------------------
// Arrays

fn array_get<T: Typed, const N: usize>(array: &dyn Reflect, index: usize) -> Option<&dyn Reflect> {
    array
        .downcast_ref::<[T; N]>()?
        .get(index)
        .map(|v| v as &dyn Reflect)
}

fn array_set<T: Typed, const N: usize>(
    array: &mut dyn Reflect,
    index: usize,
    item: Box<dyn Reflect>,
) -> Result<(), Box<dyn Reflect>> {
    let Some(slot) = array
        .downcast_mut::<[T; N]>()
        .and_then(|array| array.get_mut(index))
    else {
        return Err(item);
    };
    *slot = item.take::<T>()?;
    Ok(())
}

fn array_create<T: Typed + Default, const N: usize>() -> Box<dyn Reflect> {
    Box::new(core::array::from_fn::<T, N, _>(|_| T::default()))
}

fn array_create_shared<T: Typed + Default, const N: usize>() -> SharedObject {
    SharedObject::new(core::array::from_fn::<T, N, _>(|_| T::default()))
}

impl<T: Typed, const N: usize> TypePath for [T; N] {
    fn type_path() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["[", T::type_path(), "; ", &N.to_string(), "]"]))
    }

    fn type_name() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["[", T::type_name(), "; ", &N.to_string(), "]"]))
    }

    fn module_path() -> Option<&'static str> {
        None
    }
}

impl<T: Typed + Default, const N: usize> Typed for [T; N] {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            let info = ArrayInfo::new(T::type_info, N, array_get::<T, N>, array_set::<T, N>);
            TypeInfo::new::<Self>(TypeKind::Array(info))
                .with_create_fns(array_create::<T, N>, array_create_shared::<T, N>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_paths() {
        assert_eq!(<Vec<u8>>::type_path(), "alloc::vec::Vec<u8>");
        assert_eq!(
            <HashMap<alloc::string::String, Vec<i32>>>::type_path(),
            "std::collections::HashMap<alloc::string::String, alloc::vec::Vec<i32>>"
        );
        assert_eq!(<[u16; 4]>::type_path(), "[u16; 4]");
        assert_eq!(<Option<bool>>::type_name(), "Option<bool>");
        assert_eq!(<BTreeSet<i8>>::type_name(), "BTreeSet<i8>");
    }

    #[test]
    fn list_ops() {
        let info = <VecDeque<u8>>::type_info().as_list().unwrap();
        let mut list: Box<dyn Reflect> = Box::new(VecDeque::<u8>::new());
        info.push(&mut *list, Box::new(1u8)).unwrap();
        info.push(&mut *list, Box::new(2u8)).unwrap();
        assert!(info.push(&mut *list, Box::new(3u16)).is_err());
        assert_eq!(info.len(&*list), 2);

        let mut sum = 0;
        info.for_each(&*list, &mut |item| {
            sum += *item.downcast_ref::<u8>().unwrap();
            Ok(())
        })
        .unwrap();
        assert_eq!(sum, 3);

        info.clear(&mut *list);
        assert_eq!(info.len(&*list), 0);
    }

    #[test]
    fn vec_primitive_access_only_for_fixed_strides() {
        assert!(<Vec<f32>>::type_info().as_list().unwrap().primitive_access().is_some());
        assert!(<Vec<alloc::string::String>>::type_info().as_list().unwrap().primitive_access().is_none());
        assert!(<VecDeque<f32>>::type_info().as_list().unwrap().primitive_access().is_none());
    }

    #[test]
    fn map_insert_checks_types() {
        let info = <BTreeMap<u8, bool>>::type_info().as_map().unwrap();
        let mut map: Box<dyn Reflect> = Box::new(BTreeMap::<u8, bool>::new());
        info.insert(&mut *map, Box::new(1u8), Box::new(true)).unwrap();
        assert!(info.insert(&mut *map, Box::new(1u16), Box::new(true)).is_err());
        assert_eq!(info.len(&*map), 1);
    }

    #[test]
    fn array_set_and_create() {
        let info = <[i16; 3]>::type_info();
        let mut array = info.create_value().unwrap();
        let array_info = info.as_array().unwrap();
        array_info.set(&mut *array, 1, Box::new(7i16)).unwrap();
        assert!(array_info.set(&mut *array, 3, Box::new(7i16)).is_err());
        assert_eq!(array.downcast_ref::<[i16; 3]>(), Some(&[0, 7, 0]));
    }

    #[test]
    fn option_ops() {
        let info = <Option<u8>>::type_info().as_option().unwrap();
        let some = info.wrap_some(Box::new(4u8)).unwrap();
        assert_eq!(info.get(&*some).and_then(|v| v.downcast_ref::<u8>()), Some(&4));
        assert!(info.get(&*info.none()).is_none());
    }
}
