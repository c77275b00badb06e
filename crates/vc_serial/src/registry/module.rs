use core::fmt;

use crate::registry::TypeRegistry;

/// A batch of registrations contributed by one module.
///
/// Besides registering types, a module may add former paths for types it
/// renamed or moved, so streams written by older builds keep binding.
///
/// Modules reach a [`Registry`](crate::registry::Registry) either through
/// [`Registry::enqueue_module`](crate::registry::Registry::enqueue_module)
/// or, with the `auto_register` feature, through [`register_module!`].
///
/// [`register_module!`]: crate::register_module
#[derive(Clone, Copy)]
pub struct ModuleRegistration {
    name: &'static str,
    register: fn(&mut TypeRegistry),
}

impl ModuleRegistration {
    pub const fn new(name: &'static str, register: fn(&mut TypeRegistry)) -> Self {
        Self { name, register }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the registrations against `types`.
    #[inline]
    pub fn apply(&self, types: &mut TypeRegistry) {
        (self.register)(types);
    }
}

impl fmt::Debug for ModuleRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleRegistration").field(&self.name).finish()
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(ModuleRegistration);

/// Submits a [`ModuleRegistration`] at link time.
///
/// Every [`Registry`](crate::registry::Registry) picks submitted modules up
/// on construction, and again whenever a type name fails to bind.
///
/// ```
/// use vc_serial::registry::{Registry, TypeRegistry};
///
/// fn register(types: &mut TypeRegistry) {
///     types.register::<Vec<u16>>();
/// }
/// vc_serial::register_module!("demo::samples", register);
///
/// let registry = Registry::new();
/// assert!(registry.types().get_with_type_path("alloc::vec::Vec<u16>").is_some());
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! register_module {
    ($name:expr, $register:expr) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::ModuleRegistration::new($name, $register)
        }
    };
}

/// Without `auto_register` nothing is collected; enqueue modules by hand.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! register_module {
    ($name:expr, $register:expr) => {};
}
