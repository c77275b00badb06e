use alloc::boxed::Box;
use core::cell::Ref;

use crate::info::TypeInfo;
use crate::reflect::{Reflect, SharedObject};
use crate::registry::TypeRegistry;

/// A borrowed view of the pointee of a [`Shared`](crate::reflect::Shared) handle.
pub struct SharedView<'a> {
    /// Identity of the allocation, stable for the handle's lifetime.
    pub address: usize,
    pub value: Ref<'a, dyn Reflect>,
}

/// Describes `Shared<T>`, the only slot kind with reference identity.
#[derive(Debug)]
pub struct SharedInfo {
    target: fn() -> &'static TypeInfo,
    view: fn(&dyn Reflect) -> Option<SharedView<'_>>,
    from_object: fn(SharedObject, &TypeRegistry) -> Result<Box<dyn Reflect>, SharedObject>,
}

impl SharedInfo {
    pub fn new(
        target: fn() -> &'static TypeInfo,
        view: fn(&dyn Reflect) -> Option<SharedView<'_>>,
        from_object: fn(SharedObject, &TypeRegistry) -> Result<Box<dyn Reflect>, SharedObject>,
    ) -> Self {
        Self {
            target,
            view,
            from_object,
        }
    }

    /// Info of the `T` in `Shared<T>`.
    #[inline]
    pub fn target(&self) -> &'static TypeInfo {
        (self.target)()
    }

    /// Borrows the pointee; `None` if `handle` is not this handle type or the
    /// pointee is mutably borrowed.
    #[inline]
    pub fn view<'a>(&self, handle: &'a dyn Reflect) -> Option<SharedView<'a>> {
        (self.view)(handle)
    }

    /// Builds a handle of this type around an existing object.
    #[inline]
    pub fn from_object(
        &self,
        object: SharedObject,
        registry: &TypeRegistry,
    ) -> Result<Box<dyn Reflect>, SharedObject> {
        (self.from_object)(object, registry)
    }
}
