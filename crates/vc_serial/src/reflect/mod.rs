//! Type-erased access to values.
//!
//! Every [`Typed`] type is [`Reflect`]. Value semantics belong to plain Rust
//! values; reference semantics belong to [`Shared`] handles.

mod containers;
mod decimal;
mod primitives;
mod shared;

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

pub use decimal::{Decimal, ParseDecimalError};
pub use shared::{InterfaceCast, Shared, SharedObject, SharedTarget};

use crate::info::{TypeInfo, Typed};

/// GUID values, written as 16 raw bytes.
pub type Guid = uuid::Uuid;

// -----------------------------------------------------------------------------
// Reflect

/// A value whose [`TypeInfo`] can be queried at runtime.
///
/// Implemented for every [`Typed`] type; not meant to be implemented by hand.
///
/// ```
/// use vc_serial::reflect::Reflect;
///
/// let value: Box<dyn Reflect> = Box::new(5_u32);
/// assert_eq!(value.reflect_type_path(), "u32");
/// assert_eq!(value.take::<u32>().ok(), Some(5));
/// ```
pub trait Reflect: Any {
    fn reflect_type_info(&self) -> &'static TypeInfo;

    #[inline]
    fn reflect_type_path(&self) -> &'static str {
        self.reflect_type_info().type_path()
    }
}

impl<T: Typed> Reflect for T {
    #[inline]
    fn reflect_type_info(&self) -> &'static TypeInfo {
        T::type_info()
    }
}

impl dyn Reflect {
    /// Returns `true` if the value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }

    /// Downcasts the boxed value, handing the box back on mismatch.
    pub fn downcast<T: Any>(self: Box<dyn Reflect>) -> Result<Box<T>, Box<dyn Reflect>> {
        if !self.is::<T>() {
            return Err(self);
        }
        #[expect(unsafe_code, reason = "type is already checked")]
        let value = unsafe { <Box<dyn Any>>::downcast::<T>(self).unwrap_unchecked() };
        Ok(value)
    }

    /// Unboxes the value, handing the box back on mismatch.
    #[inline]
    pub fn take<T: Any>(self: Box<dyn Reflect>) -> Result<T, Box<dyn Reflect>> {
        self.downcast::<T>().map(|v| *v)
    }
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Reflect({})", self.reflect_type_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcasting() {
        let mut value: Box<dyn Reflect> = Box::new(alloc::string::String::from("x"));
        assert!(value.is::<alloc::string::String>());
        assert!(!value.is::<&str>());
        value.downcast_mut::<alloc::string::String>().unwrap().push('y');

        let value = value.downcast::<u8>().unwrap_err();
        assert_eq!(value.take::<alloc::string::String>().unwrap(), "xy");
    }
}
