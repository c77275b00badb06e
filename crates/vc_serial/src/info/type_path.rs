use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

// -----------------------------------------------------------------------------
// TypePath

/// A static accessor to the stable path of a type.
///
/// The path is the canonical name the binder writes into a stream, so it
/// must not change between builds. Derived types use `module_path!()` and
/// the ident, `#[reflect(type_path = "...")]` pins a custom one.
///
/// Generic types compose their path from the paths of their arguments:
///
/// ```
/// use vc_serial::info::TypePath;
///
/// assert_eq!(<Vec<i32> as TypePath>::type_path(), "alloc::vec::Vec<i32>");
/// assert_eq!(<Vec<i32> as TypePath>::type_name(), "Vec<i32>");
/// ```
pub trait TypePath: 'static {
    /// Fully qualified path, e.g. `my_crate::shapes::Circle`.
    fn type_path() -> &'static str;

    /// Path without the module part, e.g. `Circle`.
    fn type_name() -> &'static str;

    /// Module containing the type, `None` for primitives.
    fn module_path() -> Option<&'static str>;

    /// First segment of [`TypePath::module_path`].
    fn crate_name() -> Option<&'static str> {
        Self::module_path().map(crate_of)
    }
}

/// Returns the first segment of a `::` separated path.
#[inline]
pub fn crate_of(path: &str) -> &str {
    path.split_once("::").map_or(path, |(krate, _)| krate)
}

// -----------------------------------------------------------------------------
// Type

/// The [`TypeId`] of a type together with its [`TypePath`] accessors.
#[derive(Clone, Copy)]
pub struct Type {
    id: TypeId,
    path: fn() -> &'static str,
    name: fn() -> &'static str,
    module_path: fn() -> Option<&'static str>,
}

impl Type {
    pub fn of<T: TypePath + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            path: T::type_path,
            name: T::type_name,
            module_path: T::module_path,
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn path(&self) -> &'static str {
        (self.path)()
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    #[inline]
    pub fn module_path(&self) -> Option<&'static str> {
        (self.module_path)()
    }

    #[inline]
    pub fn crate_name(&self) -> Option<&'static str> {
        self.module_path().map(crate_of)
    }

    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for Type {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_of_path() {
        assert_eq!(crate_of("my_crate::a::B"), "my_crate");
        assert_eq!(crate_of("single"), "single");
    }

    #[test]
    fn type_accessors() {
        let ty = Type::of::<alloc::string::String>();
        assert!(ty.is::<alloc::string::String>());
        assert_eq!(ty.path(), "alloc::string::String");
        assert_eq!(ty.name(), "String");
        assert_eq!(ty.crate_name(), Some("alloc"));
        assert_eq!(Type::of::<u8>().module_path(), None);
    }
}
