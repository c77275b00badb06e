//! Portable type identifiers.
//!
//! A [`TypeBinder`] turns a type into the name written in a stream and a
//! name read back into a registered type. The default binder writes full
//! type paths and resolves names through, in order: its name cache, the
//! former-path table, a direct registry lookup, the `Def<A, B>` / `[T; N]`
//! grammar, and finally a search of the registered crates.

mod default;
mod parse;

pub use default::DefaultTypeBinder;

use crate::info::TypeInfo;
use crate::registry::TypeRegistry;

/// Bidirectional mapping between types and stream names.
pub trait TypeBinder: Send + Sync {
    /// The name written for `info`.
    fn bind_to_name(&self, info: &'static TypeInfo) -> &'static str;

    /// The registered type a stream name refers to.
    ///
    /// Failures are not errors: the caller decides how to degrade.
    fn bind_to_type(&self, types: &TypeRegistry, name: &str) -> Option<&'static TypeInfo>;
}
