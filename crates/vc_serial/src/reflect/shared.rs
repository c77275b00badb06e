use alloc::boxed::Box;
use alloc::rc::Rc;
use core::any::Any;
use core::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use core::fmt;

use crate::info::{
    GenericArg, GenericInfo, GenericTypeInfoCell, GenericTypePathCell, NonGenericTypeInfoCell,
    SharedInfo, SharedView, TypeInfo, TypeKind, TypePath, Typed, concat,
};
use crate::reflect::Reflect;
use crate::registry::TypeRegistry;

// -----------------------------------------------------------------------------
// Shared

/// A shared, mutable handle: the only slot kind with reference identity.
///
/// Two handles to the same allocation are written once; the second write
/// becomes an internal reference and reading restores a single allocation.
///
/// `T` may be a concrete [`Typed`] type, `dyn Reflect`, or an interface
/// declared with [`impl_shared_interface!`](crate::impl_shared_interface).
pub struct Shared<T: ?Sized>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }
}

impl<T: Typed> Shared<T> {
    /// Erases the pointee type, keeping the allocation.
    pub fn into_dyn(self) -> Shared<dyn Reflect> {
        let rc: Rc<RefCell<dyn Reflect>> = self.0;
        Shared(rc)
    }
}

impl<T: ?Sized> Shared<T> {
    #[inline]
    pub fn from_rc(rc: Rc<RefCell<T>>) -> Self {
        Self(rc)
    }

    #[inline]
    pub fn as_rc(&self) -> &Rc<RefCell<T>> {
        &self.0
    }

    #[inline]
    pub fn into_rc(self) -> Rc<RefCell<T>> {
        self.0
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    #[inline]
    pub fn try_borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.0.try_borrow()
    }

    #[inline]
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    /// Address of the allocation; equal for every handle to the same object,
    /// whatever their target type.
    #[inline]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>().addr()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` if both handles point at the same allocation.
    #[inline]
    pub fn same_object<U: ?Sized>(&self, other: &Shared<U>) -> bool {
        self.address() == other.address()
    }

    /// Returns `true` if `value` is the pointee of this handle.
    ///
    /// External resolvers receive the pointee only; this is how they
    /// recognize the objects they own.
    #[inline]
    pub fn is_value(&self, value: &dyn Reflect) -> bool {
        core::ptr::addr_eq(self.0.as_ptr(), value as *const dyn Reflect)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Shared").field(&&*value).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

// -----------------------------------------------------------------------------
// SharedTarget

/// A type that can sit behind a [`Shared`] handle.
pub trait SharedTarget: TypePath {
    fn as_reflect(&self) -> &dyn Reflect;

    /// Builds a handle to `object`, handing it back if it is not assignable.
    fn from_object(
        object: SharedObject,
        registry: &TypeRegistry,
    ) -> Result<Shared<Self>, SharedObject>;
}

impl<T: Typed> SharedTarget for T {
    #[inline]
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn from_object(object: SharedObject, _: &TypeRegistry) -> Result<Shared<T>, SharedObject> {
        object.downcast::<T>().ok_or(object)
    }
}

impl SharedTarget for dyn Reflect {
    #[inline]
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn from_object(object: SharedObject, _: &TypeRegistry) -> Result<Shared<Self>, SharedObject> {
        Ok(Shared(object.object))
    }
}

impl TypePath for dyn Reflect {
    fn type_path() -> &'static str {
        "vc_serial::reflect::Reflect"
    }

    fn type_name() -> &'static str {
        "Reflect"
    }

    fn module_path() -> Option<&'static str> {
        Some("vc_serial::reflect")
    }
}

impl Typed for dyn Reflect {
    fn type_info() -> &'static TypeInfo {
        static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::interface::<dyn Reflect>(true))
    }
}

fn view<T: SharedTarget + ?Sized>(handle: &dyn Reflect) -> Option<SharedView<'_>> {
    let shared = handle.downcast_ref::<Shared<T>>()?;
    let value = shared.0.try_borrow().ok()?;
    Some(SharedView {
        address: shared.address(),
        value: Ref::map(value, T::as_reflect),
    })
}

fn from_object<T: SharedTarget + Typed + ?Sized>(
    object: SharedObject,
    registry: &TypeRegistry,
) -> Result<Box<dyn Reflect>, SharedObject> {
    T::from_object(object, registry).map(|shared| Box::new(shared) as Box<dyn Reflect>)
}

impl<T: SharedTarget + Typed + ?Sized> TypePath for Shared<T> {
    fn type_path() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["vc_serial::Shared<", T::type_path(), ">"]))
    }

    fn type_name() -> &'static str {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();
        CELL.get_or_insert::<Self>(|| concat(&["Shared<", T::type_name(), ">"]))
    }

    fn module_path() -> Option<&'static str> {
        Some("vc_serial")
    }
}

impl<T: SharedTarget + Typed + ?Sized> Typed for Shared<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeInfo::new::<Self>(TypeKind::Shared(SharedInfo::new(
                T::type_info,
                view::<T>,
                from_object::<T>,
            )))
            .with_generics(GenericInfo::new(
                "vc_serial::Shared",
                [GenericArg::Type(T::type_info)],
            ))
        })
    }
}

// -----------------------------------------------------------------------------
// SharedObject

/// A type-erased handle to one shared allocation.
///
/// Holds both an `Any` view (to rebuild typed handles) and a `Reflect` view
/// (to populate members) of the same allocation. This is what the read-side
/// reference table and the external resolvers deal in.
#[derive(Clone)]
pub struct SharedObject {
    info: &'static TypeInfo,
    any: Rc<dyn Any>,
    object: Rc<RefCell<dyn Reflect>>,
}

impl SharedObject {
    pub fn new<T: Typed>(value: T) -> Self {
        Self::from_rc(Rc::new(RefCell::new(value)))
    }

    pub fn from_rc<T: Typed>(rc: Rc<RefCell<T>>) -> Self {
        Self {
            info: T::type_info(),
            any: rc.clone(),
            object: rc,
        }
    }

    /// An erased handle to the same allocation as `shared`.
    pub fn from_shared<T: Typed>(shared: &Shared<T>) -> Self {
        Self::from_rc(shared.0.clone())
    }

    /// Info of the concrete type, available even while the object is
    /// mutably borrowed.
    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    /// A typed handle to the same allocation.
    pub fn downcast<T: Typed>(&self) -> Option<Shared<T>> {
        self.any.clone().downcast::<RefCell<T>>().ok().map(Shared)
    }

    #[inline]
    pub fn as_any(&self) -> &Rc<dyn Any> {
        &self.any
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, dyn Reflect> {
        self.object.borrow()
    }

    #[inline]
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Reflect>, BorrowMutError> {
        self.object.try_borrow_mut()
    }

    #[inline]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.object).cast::<()>().addr()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }

    /// Whether `value` is the pointee of this object.
    #[inline]
    pub fn is_value(&self, value: &dyn Reflect) -> bool {
        core::ptr::addr_eq(self.object.as_ptr(), value as *const dyn Reflect)
    }

    #[inline]
    pub fn into_shared_reflect(self) -> Shared<dyn Reflect> {
        Shared(self.object)
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObject")
            .field("type", &self.info.type_path())
            .field("address", &self.address())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Interfaces

/// Upcast from an erased object to `Shared<I>` for one concrete type.
///
/// Registered with [`TypeRegistry::register_cast`].
pub struct InterfaceCast<I: ?Sized> {
    cast: Box<dyn Fn(Rc<dyn Any>) -> Option<Rc<RefCell<I>>> + Send + Sync>,
}

impl<I: ?Sized + 'static> InterfaceCast<I> {
    pub fn new<C: Typed>(upcast: fn(Rc<RefCell<C>>) -> Rc<RefCell<I>>) -> Self {
        Self {
            cast: Box::new(move |any| any.downcast::<RefCell<C>>().ok().map(upcast)),
        }
    }

    pub fn apply(&self, object: &SharedObject) -> Option<Shared<I>> {
        (self.cast)(object.any.clone()).map(Shared)
    }
}

/// Declares a trait object as a [`Shared`] target.
///
/// The trait must have [`Reflect`] as a supertrait. Concrete types become
/// assignable through [`TypeRegistry::register_cast`].
///
/// ```
/// use vc_serial::derive::Reflect;
/// use vc_serial::reflect::{Reflect, Shared};
/// use vc_serial::registry::TypeRegistry;
///
/// pub trait Shape: Reflect {
///     fn area(&self) -> f64;
/// }
/// vc_serial::impl_shared_interface!(dyn Shape as "demo::Shape");
///
/// #[derive(Reflect, Default)]
/// pub struct Square {
///     pub side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register_cast::<Square, dyn Shape>(|rc| rc);
/// ```
#[macro_export]
macro_rules! impl_shared_interface {
    (dyn $trait:path as $path:literal) => {
        impl $crate::info::TypePath for dyn $trait {
            fn type_path() -> &'static str {
                $path
            }

            fn type_name() -> &'static str {
                match $path.rsplit_once("::") {
                    Some((_, name)) => name,
                    None => $path,
                }
            }

            fn module_path() -> Option<&'static str> {
                $path.rsplit_once("::").map(|(module, _)| module)
            }
        }

        impl $crate::info::Typed for dyn $trait {
            fn type_info() -> &'static $crate::info::TypeInfo {
                static CELL: $crate::info::NonGenericTypeInfoCell =
                    $crate::info::NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| $crate::info::TypeInfo::interface::<dyn $trait>(false))
            }
        }

        impl $crate::reflect::SharedTarget for dyn $trait {
            fn as_reflect(&self) -> &dyn $crate::reflect::Reflect {
                self
            }

            fn from_object(
                object: $crate::reflect::SharedObject,
                registry: &$crate::registry::TypeRegistry,
            ) -> ::core::result::Result<$crate::reflect::Shared<Self>, $crate::reflect::SharedObject>
            {
                registry.cast_object::<dyn $trait>(object)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_across_target_types() {
        let a = Shared::new(5_i32);
        let obj = SharedObject::from_shared(&a);
        let erased = obj.clone().into_shared_reflect();
        assert!(a.same_object(&erased));
        assert_eq!(a.address(), obj.address());

        let again = obj.downcast::<i32>().unwrap();
        *again.borrow_mut() = 9;
        assert_eq!(*a.borrow(), 9);
        assert!(obj.downcast::<u32>().is_none());
    }

    #[test]
    fn is_value_matches_pointee() {
        let a = Shared::new(alloc::string::String::from("a"));
        let b = Shared::new(alloc::string::String::from("a"));
        let value = a.borrow();
        assert!(a.is_value(&*value));
        assert!(!b.is_value(&*value));
    }

    #[test]
    fn view_borrows_pointee() {
        let handle = Shared::new(3_u8);
        let info = <Shared<u8>>::type_info().as_shared().unwrap();
        let view = info.view(&handle).unwrap();
        assert_eq!(view.address, handle.address());
        assert_eq!(view.value.downcast_ref::<u8>(), Some(&3));
        drop(view);

        let _guard = handle.borrow_mut();
        assert!(info.view(&handle).is_none());
    }

    #[test]
    fn shared_type_path() {
        assert_eq!(
            <Shared<dyn Reflect>>::type_path(),
            "vc_serial::Shared<vc_serial::reflect::Reflect>"
        );
        assert_eq!(<Shared<u8>>::type_name(), "Shared<u8>");
    }
}
