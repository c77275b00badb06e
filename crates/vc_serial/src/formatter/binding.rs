use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use crate::formatter::{
    ArrayFormatter, EmptyFormatter, Formatter, ListFormatter, MapFormatter, PrimitiveListFormatter,
};
use crate::info::TypeInfo;
use crate::policy::SerializationPolicy;

/// Builds the formatter of a type matched by a [`TypePattern`].
pub type FormatterFactory = fn(&'static TypeInfo, &SerializationPolicy) -> Arc<dyn Formatter>;

/// The types a [`FormatterBinding`] applies to.
#[derive(Clone, Copy)]
pub enum TypePattern {
    /// Exactly one type.
    Exact(TypeId),
    /// Every registered instantiation of a generic definition, such as
    /// `alloc::vec::Vec`.
    GenericDefinition(&'static str),
    /// Any type the predicate accepts.
    Matches(fn(&TypeInfo, &SerializationPolicy) -> bool),
}

impl TypePattern {
    pub fn matches(&self, info: &TypeInfo, policy: &SerializationPolicy) -> bool {
        match self {
            Self::Exact(type_id) => info.type_id() == *type_id,
            Self::GenericDefinition(definition) => info
                .generics()
                .is_some_and(|generics| generics.definition() == *definition),
            Self::Matches(predicate) => predicate(info, policy),
        }
    }
}

impl fmt::Debug for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(type_id) => f.debug_tuple("Exact").field(type_id).finish(),
            Self::GenericDefinition(definition) => {
                f.debug_tuple("GenericDefinition").field(definition).finish()
            }
            Self::Matches(_) => f.write_str("Matches(..)"),
        }
    }
}

/// A static entry of the formatter table: a pattern, a priority and a
/// factory.
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::formatter::{EmptyFormatter, FormatterBinding, TypePattern};
/// use vc_serial::registry::Registry;
///
/// let registry = Registry::new();
/// registry.add_binding(FormatterBinding::new(
///     TypePattern::GenericDefinition("alloc::collections::BTreeSet"),
///     100,
///     |info, _| Arc::new(EmptyFormatter::new(info)),
/// ));
/// ```
#[derive(Clone)]
pub struct FormatterBinding {
    pattern: TypePattern,
    priority: i32,
    factory: FormatterFactory,
}

impl FormatterBinding {
    pub const fn new(pattern: TypePattern, priority: i32, factory: FormatterFactory) -> Self {
        Self {
            pattern,
            priority,
            factory,
        }
    }

    #[inline]
    pub fn pattern(&self) -> &TypePattern {
        &self.pattern
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The formatter for `info`, if the pattern matches.
    pub fn build(&self, info: &'static TypeInfo, policy: &SerializationPolicy) -> Option<Arc<dyn Formatter>> {
        self.pattern
            .matches(info, policy)
            .then(|| (self.factory)(info, policy))
    }
}

impl fmt::Debug for FormatterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterBinding")
            .field("pattern", &self.pattern)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Built-in table

fn is_primitive_list(info: &TypeInfo, _: &SerializationPolicy) -> bool {
    info.as_list()
        .is_some_and(|list| list.primitive_access().is_some())
}

fn is_list(info: &TypeInfo, _: &SerializationPolicy) -> bool {
    info.as_list().is_some()
}

fn is_array(info: &TypeInfo, _: &SerializationPolicy) -> bool {
    info.as_array().is_some()
}

fn is_map(info: &TypeInfo, _: &SerializationPolicy) -> bool {
    info.as_map().is_some()
}

fn is_excluded(info: &TypeInfo, policy: &SerializationPolicy) -> bool {
    !info.is_serializable() && !policy.allow_non_serializable_types()
}

fn primitive_list(info: &'static TypeInfo, _: &SerializationPolicy) -> Arc<dyn Formatter> {
    match info.as_list() {
        Some(list) => match list.primitive_access() {
            Some(access) => Arc::new(PrimitiveListFormatter::new(info, list, *access)),
            None => Arc::new(ListFormatter::new(info, list)),
        },
        None => Arc::new(EmptyFormatter::new(info)),
    }
}

fn list(info: &'static TypeInfo, _: &SerializationPolicy) -> Arc<dyn Formatter> {
    match info.as_list() {
        Some(list) => Arc::new(ListFormatter::new(info, list)),
        None => Arc::new(EmptyFormatter::new(info)),
    }
}

fn array(info: &'static TypeInfo, _: &SerializationPolicy) -> Arc<dyn Formatter> {
    match info.as_array() {
        Some(array) => Arc::new(ArrayFormatter::new(info, array)),
        None => Arc::new(EmptyFormatter::new(info)),
    }
}

fn map(info: &'static TypeInfo, _: &SerializationPolicy) -> Arc<dyn Formatter> {
    match info.as_map() {
        Some(map) => Arc::new(MapFormatter::new(info, map)),
        None => Arc::new(EmptyFormatter::new(info)),
    }
}

fn empty(info: &'static TypeInfo, _: &SerializationPolicy) -> Arc<dyn Formatter> {
    Arc::new(EmptyFormatter::new(info))
}

/// The bindings every registry starts with.
pub(crate) fn builtin_bindings() -> Vec<FormatterBinding> {
    vec![
        FormatterBinding::new(TypePattern::Matches(is_excluded), 60, empty),
        FormatterBinding::new(TypePattern::Matches(is_primitive_list), 50, primitive_list),
        FormatterBinding::new(TypePattern::Matches(is_list), 40, list),
        FormatterBinding::new(TypePattern::Matches(is_array), 40, array),
        FormatterBinding::new(TypePattern::Matches(is_map), 40, map),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Typed;

    #[test]
    fn patterns() {
        let policy = SerializationPolicy::standard();
        let info = <Vec<u8>>::type_info();
        assert!(TypePattern::Exact(TypeId::of::<Vec<u8>>()).matches(info, &policy));
        assert!(TypePattern::GenericDefinition("alloc::vec::Vec").matches(info, &policy));
        assert!(!TypePattern::GenericDefinition("alloc::collections::VecDeque").matches(info, &policy));
        assert!(TypePattern::Matches(is_primitive_list).matches(info, &policy));
        assert!(!TypePattern::Matches(is_primitive_list).matches(<Vec<String>>::type_info(), &policy));
    }

    #[test]
    fn builtin_table_covers_collections() {
        let policy = SerializationPolicy::standard();
        let bindings = builtin_bindings();
        for info in [
            <Vec<String>>::type_info(),
            <[u8; 3]>::type_info(),
            <std::collections::BTreeMap<u8, u8>>::type_info(),
        ] {
            assert!(bindings.iter().any(|b| b.build(info, &policy).is_some()));
        }
        assert!(bindings.iter().all(|b| b.build(u8::type_info(), &policy).is_none()));
    }
}
