//! Lazily initialized static storage for [`TypeInfo`] and generic paths.
//!
//! A `static` declared inside a generic function is shared by every
//! instantiation, so the generic cells key their content by [`TypeId`].
//! Values are built outside the lock; building one may need the path
//! of a nested instantiation that lives in the same cell.

use alloc::boxed::Box;
use alloc::string::String;
use core::any::TypeId;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::hash::TypeIdMap;
use crate::info::TypeInfo;

/// Storage for the [`TypeInfo`] of a non-generic type.
pub struct NonGenericTypeInfoCell(OnceLock<TypeInfo>);

impl NonGenericTypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored info, initializing it with `f` on first use.
    #[inline]
    pub fn get_or_init(&self, f: impl FnOnce() -> TypeInfo) -> &TypeInfo {
        self.0.get_or_init(f)
    }
}

/// Storage for the [`TypeInfo`] of every instantiation of a generic type.
pub struct GenericTypeInfoCell(GenericCell<TypeInfo>);

impl GenericTypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(GenericCell::new())
    }

    /// Returns the info stored for `G`, inserting the result of `f` on first use.
    #[inline]
    pub fn get_or_insert<G: ?Sized + 'static>(
        &self,
        f: impl FnOnce() -> TypeInfo,
    ) -> &'static TypeInfo {
        self.0.get_or_insert(TypeId::of::<G>(), f)
    }
}

/// Storage for the composed path strings of a generic type.
pub struct GenericTypePathCell(GenericCell<String>);

impl GenericTypePathCell {
    #[inline]
    pub const fn new() -> Self {
        Self(GenericCell::new())
    }

    #[inline]
    pub fn get_or_insert<G: ?Sized + 'static>(&self, f: impl FnOnce() -> String) -> &'static str {
        self.0.get_or_insert(TypeId::of::<G>(), f)
    }
}

struct GenericCell<T: 'static>(OnceLock<RwLock<TypeIdMap<&'static T>>>);

impl<T: Send + Sync + 'static> GenericCell<T> {
    const fn new() -> Self {
        Self(OnceLock::new())
    }

    fn get_or_insert(&self, id: TypeId, f: impl FnOnce() -> T) -> &'static T {
        let map = self.0.get_or_init(Default::default);

        if let Some(value) = map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return value;
        }

        let value = f();

        let mut guard = map.write().unwrap_or_else(PoisonError::into_inner);
        *guard.entry(id).or_insert_with(|| Box::leak(Box::new(value)))
    }
}

/// Joins path fragments, the building block of generic [`TypePath`]s.
///
/// [`TypePath`]: crate::info::TypePath
pub fn concat(fragments: &[&str]) -> String {
    let len = fragments.iter().map(|s| s.len()).sum();
    let mut out = String::with_capacity(len);
    fragments.iter().for_each(|s| out.push_str(s));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_path_cell_keys_by_type() {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        let a = CELL.get_or_insert::<u8>(|| concat(&["A<", "u8", ">"]));
        let b = CELL.get_or_insert::<u16>(|| concat(&["A<", "u16", ">"]));
        let again = CELL.get_or_insert::<u8>(|| String::from("unused"));
        assert_eq!(a, "A<u8>");
        assert_eq!(b, "A<u16>");
        assert!(core::ptr::eq(a, again));
    }
}
