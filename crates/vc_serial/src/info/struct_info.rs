use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::HookError;
use crate::hash::HashMap;
use crate::info::{TypeInfo, Typed};
use crate::reflect::Reflect;

/// Reads one field out of its owner.
pub type FieldGetter = fn(&dyn Reflect) -> Option<&dyn Reflect>;

/// Moves a value into one field, handing it back on a type mismatch.
pub type FieldSetter = fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

/// Hook fired around writing the members of a value.
pub type SerializeHook = fn(&dyn Reflect) -> Result<(), HookError>;

/// Hook fired around reading the members of a value.
pub type DeserializeHook = fn(&mut dyn Reflect) -> Result<(), HookError>;

/// Field markers consulted by [`SerializationPolicy`](crate::policy::SerializationPolicy).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAttributes {
    /// Declared `pub`.
    pub public: bool,
    /// Marked `#[reflect(serialize)]`.
    pub serialize: bool,
    /// Marked `#[reflect(skip)]`.
    pub skip: bool,
}

/// One field of a struct.
#[derive(Clone)]
pub struct FieldInfo {
    name: &'static str,
    former_names: &'static [&'static str],
    type_info: fn() -> &'static TypeInfo,
    attributes: FieldAttributes,
    getter: FieldGetter,
    setter: FieldSetter,
}

impl FieldInfo {
    pub fn new<F: Typed>(name: &'static str, getter: FieldGetter, setter: FieldSetter) -> Self {
        Self {
            name,
            former_names: &[],
            type_info: F::type_info,
            attributes: FieldAttributes::default(),
            getter,
            setter,
        }
    }

    pub fn with_attributes(mut self, attributes: FieldAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Names this field had in earlier builds.
    pub fn with_former_names(mut self, names: &'static [&'static str]) -> Self {
        self.former_names = names;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn former_names(&self) -> &'static [&'static str] {
        self.former_names
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        (self.type_info)()
    }

    #[inline]
    pub fn attributes(&self) -> &FieldAttributes {
        &self.attributes
    }

    #[inline]
    pub fn get<'a>(&self, owner: &'a dyn Reflect) -> Option<&'a dyn Reflect> {
        (self.getter)(owner)
    }

    #[inline]
    pub fn set(&self, owner: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        (self.setter)(owner, value)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("former_names", &self.former_names)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Ordered lifecycle hooks of a struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleHooks {
    pub before_serialize: Option<SerializeHook>,
    pub after_serialize: Option<SerializeHook>,
    pub before_deserialize: Option<DeserializeHook>,
    pub after_deserialize: Option<DeserializeHook>,
}

/// Fields and hooks of a struct, in declaration order.
///
/// Tuple structs name their fields `"0"`, `"1"`, ...
#[derive(Debug)]
pub struct StructInfo {
    fields: Box<[FieldInfo]>,
    // current and former names to index
    lookup: HashMap<&'static str, usize>,
    hooks: LifecycleHooks,
}

impl StructInfo {
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        let mut lookup = HashMap::default();
        // Former names never shadow a current name.
        for (index, field) in fields.iter().enumerate() {
            for former in field.former_names() {
                lookup.insert(*former, index);
            }
        }
        for (index, field) in fields.iter().enumerate() {
            lookup.insert(field.name(), index);
        }

        Self {
            fields: fields.into_boxed_slice(),
            lookup,
            hooks: LifecycleHooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[inline]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    #[inline]
    pub fn field_len(&self) -> usize {
        self.fields.len()
    }

    /// Finds a field by its current or a former name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.index_of(name).map(|index| &self.fields[index])
    }

    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    #[inline]
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }
}
