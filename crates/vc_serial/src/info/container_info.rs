use alloc::boxed::Box;

use crate::error::SerialResult;
use crate::format::{PrimitiveArray, PrimitiveSlice};
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::Reflect;

/// Visits every element of a collection until the visitor fails.
pub type ForEachItem =
    fn(&dyn Reflect, &mut dyn FnMut(&dyn Reflect) -> SerialResult<()>) -> SerialResult<()>;

/// Visits every entry of a map until the visitor fails.
pub type ForEachEntry = fn(
    &dyn Reflect,
    &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> SerialResult<()>,
) -> SerialResult<()>;

// -----------------------------------------------------------------------------
// ListInfo

/// A growable collection: `Vec`, `VecDeque`, sets.
#[derive(Debug)]
pub struct ListInfo {
    item: fn() -> &'static TypeInfo,
    len: fn(&dyn Reflect) -> usize,
    for_each: ForEachItem,
    push: fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>,
    clear: fn(&mut dyn Reflect),
    primitive: Option<PrimitiveListAccess>,
}

/// Bulk access to a list of fixed-stride primitives.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveListAccess {
    pub kind: PrimitiveKind,
    pub as_slice: fn(&dyn Reflect) -> Option<PrimitiveSlice<'_>>,
    pub assign: fn(&mut dyn Reflect, PrimitiveArray) -> Result<(), PrimitiveArray>,
}

impl ListInfo {
    pub fn new(
        item: fn() -> &'static TypeInfo,
        len: fn(&dyn Reflect) -> usize,
        for_each: ForEachItem,
        push: fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>,
        clear: fn(&mut dyn Reflect),
    ) -> Self {
        Self {
            item,
            len,
            for_each,
            push,
            clear,
            primitive: None,
        }
    }

    pub fn with_primitive_access(mut self, access: Option<PrimitiveListAccess>) -> Self {
        self.primitive = access;
        self
    }

    #[inline]
    pub fn item(&self) -> &'static TypeInfo {
        (self.item)()
    }

    #[inline]
    pub fn len(&self, list: &dyn Reflect) -> usize {
        (self.len)(list)
    }

    #[inline]
    pub fn for_each(
        &self,
        list: &dyn Reflect,
        f: &mut dyn FnMut(&dyn Reflect) -> SerialResult<()>,
    ) -> SerialResult<()> {
        (self.for_each)(list, f)
    }

    #[inline]
    pub fn push(&self, list: &mut dyn Reflect, item: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        (self.push)(list, item)
    }

    #[inline]
    pub fn clear(&self, list: &mut dyn Reflect) {
        (self.clear)(list)
    }

    #[inline]
    pub fn primitive_access(&self) -> Option<&PrimitiveListAccess> {
        self.primitive.as_ref()
    }
}

// -----------------------------------------------------------------------------
// ArrayInfo

/// A fixed size array `[T; N]`.
#[derive(Debug)]
pub struct ArrayInfo {
    item: fn() -> &'static TypeInfo,
    len: usize,
    get: fn(&dyn Reflect, usize) -> Option<&dyn Reflect>,
    set: fn(&mut dyn Reflect, usize, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>,
}

impl ArrayInfo {
    pub fn new(
        item: fn() -> &'static TypeInfo,
        len: usize,
        get: fn(&dyn Reflect, usize) -> Option<&dyn Reflect>,
        set: fn(&mut dyn Reflect, usize, Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>,
    ) -> Self {
        Self { item, len, get, set }
    }

    #[inline]
    pub fn item(&self) -> &'static TypeInfo {
        (self.item)()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn get<'a>(&self, array: &'a dyn Reflect, index: usize) -> Option<&'a dyn Reflect> {
        (self.get)(array, index)
    }

    #[inline]
    pub fn set(
        &self,
        array: &mut dyn Reflect,
        index: usize,
        item: Box<dyn Reflect>,
    ) -> Result<(), Box<dyn Reflect>> {
        (self.set)(array, index, item)
    }
}

// -----------------------------------------------------------------------------
// MapInfo

/// A key-value collection.
#[derive(Debug)]
pub struct MapInfo {
    key: fn() -> &'static TypeInfo,
    value: fn() -> &'static TypeInfo,
    len: fn(&dyn Reflect) -> usize,
    for_each: ForEachEntry,
    insert: fn(
        &mut dyn Reflect,
        Box<dyn Reflect>,
        Box<dyn Reflect>,
    ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)>,
    clear: fn(&mut dyn Reflect),
}

impl MapInfo {
    pub fn new(
        key: fn() -> &'static TypeInfo,
        value: fn() -> &'static TypeInfo,
        len: fn(&dyn Reflect) -> usize,
        for_each: ForEachEntry,
        insert: fn(
            &mut dyn Reflect,
            Box<dyn Reflect>,
            Box<dyn Reflect>,
        ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)>,
        clear: fn(&mut dyn Reflect),
    ) -> Self {
        Self {
            key,
            value,
            len,
            for_each,
            insert,
            clear,
        }
    }

    #[inline]
    pub fn key(&self) -> &'static TypeInfo {
        (self.key)()
    }

    #[inline]
    pub fn value(&self) -> &'static TypeInfo {
        (self.value)()
    }

    #[inline]
    pub fn len(&self, map: &dyn Reflect) -> usize {
        (self.len)(map)
    }

    #[inline]
    pub fn for_each(
        &self,
        map: &dyn Reflect,
        f: &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> SerialResult<()>,
    ) -> SerialResult<()> {
        (self.for_each)(map, f)
    }

    #[inline]
    pub fn insert(
        &self,
        map: &mut dyn Reflect,
        key: Box<dyn Reflect>,
        value: Box<dyn Reflect>,
    ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)> {
        (self.insert)(map, key, value)
    }

    #[inline]
    pub fn clear(&self, map: &mut dyn Reflect) {
        (self.clear)(map)
    }
}

// -----------------------------------------------------------------------------
// OptionInfo

/// `Option<T>`, the nullable slot.
#[derive(Debug)]
pub struct OptionInfo {
    some: fn() -> &'static TypeInfo,
    get: fn(&dyn Reflect) -> Option<&dyn Reflect>,
    wrap_some: fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>,
    none: fn() -> Box<dyn Reflect>,
}

impl OptionInfo {
    pub fn new(
        some: fn() -> &'static TypeInfo,
        get: fn(&dyn Reflect) -> Option<&dyn Reflect>,
        wrap_some: fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>>,
        none: fn() -> Box<dyn Reflect>,
    ) -> Self {
        Self {
            some,
            get,
            wrap_some,
            none,
        }
    }

    /// Info of the `T` in `Option<T>`.
    #[inline]
    pub fn some(&self) -> &'static TypeInfo {
        (self.some)()
    }

    /// The contained value, `None` for an empty option.
    #[inline]
    pub fn get<'a>(&self, option: &'a dyn Reflect) -> Option<&'a dyn Reflect> {
        (self.get)(option)
    }

    #[inline]
    pub fn wrap_some(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Box<dyn Reflect>> {
        (self.wrap_some)(value)
    }

    #[inline]
    pub fn none(&self) -> Box<dyn Reflect> {
        (self.none)()
    }
}
