//! Member-selection policies.
//!
//! A policy decides which fields of a struct take part in serialization and
//! whether types marked `not_serializable` may be written at all. Dispatchers
//! and formatters are cached per `(type, policy)`, so policies are immutable
//! and compared by id.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use crate::info::{FieldInfo, StructInfo};

/// Every field that is not `#[reflect(skip)]`.
pub const PERMISSIVE: &str = "permissive";
/// Only fields marked `#[reflect(serialize)]`.
pub const STRICT: &str = "strict";
/// Public or `#[reflect(serialize)]` fields that are not skipped.
pub const STANDARD: &str = "standard";

type MemberFilter = Box<dyn Fn(&StructInfo, &FieldInfo) -> bool + Send + Sync>;

struct PolicyInner {
    id: Cow<'static, str>,
    allow_non_serializable_types: bool,
    filter: MemberFilter,
}

/// A shared, immutable member-selection policy.
#[derive(Clone)]
pub struct SerializationPolicy(Arc<PolicyInner>);

impl SerializationPolicy {
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        allow_non_serializable_types: bool,
        filter: impl Fn(&StructInfo, &FieldInfo) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(PolicyInner {
            id: id.into(),
            allow_non_serializable_types,
            filter: Box::new(filter),
        }))
    }

    pub fn permissive() -> Self {
        Self::new(PERMISSIVE, true, |_, field| !field.attributes().skip)
    }

    pub fn strict() -> Self {
        Self::new(STRICT, false, |_, field| field.attributes().serialize)
    }

    pub fn standard() -> Self {
        Self::new(STANDARD, false, |_, field| {
            let attrs = field.attributes();
            (attrs.public || attrs.serialize) && !attrs.skip
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    #[inline]
    pub fn allow_non_serializable_types(&self) -> bool {
        self.0.allow_non_serializable_types
    }

    /// Whether `field` of `owner` is part of the serialized member set.
    #[inline]
    pub fn should_serialize(&self, owner: &StructInfo, field: &FieldInfo) -> bool {
        (self.0.filter)(owner, field)
    }
}

impl PartialEq for SerializationPolicy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.id() == other.id()
    }
}

impl Eq for SerializationPolicy {}

impl fmt::Debug for SerializationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationPolicy")
            .field("id", &self.id())
            .field(
                "allow_non_serializable_types",
                &self.allow_non_serializable_types(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::info::{FieldAttributes, FieldInfo};
    use crate::reflect::Reflect;

    fn get(_: &dyn Reflect) -> Option<&dyn Reflect> {
        None
    }

    fn set(_: &mut dyn Reflect, v: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        Err(v)
    }

    fn field(name: &'static str, public: bool, serialize: bool, skip: bool) -> FieldInfo {
        FieldInfo::new::<u8>(name, get, set).with_attributes(FieldAttributes {
            public,
            serialize,
            skip,
        })
    }

    fn selected(policy: &SerializationPolicy, info: &StructInfo) -> alloc::vec::Vec<&'static str> {
        info.fields()
            .iter()
            .filter(|f| policy.should_serialize(info, f))
            .map(FieldInfo::name)
            .collect()
    }

    #[test]
    fn builtin_member_sets() {
        let info = StructInfo::new(vec![
            field("private", false, false, false),
            field("public", true, false, false),
            field("marked", false, true, false),
            field("skipped", true, false, true),
        ]);

        assert_eq!(
            selected(&SerializationPolicy::permissive(), &info),
            ["private", "public", "marked"]
        );
        assert_eq!(selected(&SerializationPolicy::strict(), &info), ["marked"]);
        assert_eq!(
            selected(&SerializationPolicy::standard(), &info),
            ["public", "marked"]
        );
    }

    #[test]
    fn compared_by_id() {
        assert_eq!(SerializationPolicy::strict(), SerializationPolicy::strict());
        assert_ne!(SerializationPolicy::strict(), SerializationPolicy::standard());
        assert!(SerializationPolicy::permissive().allow_non_serializable_types());
        assert!(!SerializationPolicy::standard().allow_non_serializable_types());
    }
}
