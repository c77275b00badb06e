use alloc::string::String;
use alloc::vec::Vec;

use crate::reflect::{Guid, Reflect, SharedObject};

/// Substitutes host-owned objects by an integer index.
///
/// Resolvers of one kind form a chain on the session context: the first
/// one that claims a value wins.
pub trait ExternalIndexReferenceResolver {
    /// The index to write instead of `value`, if this resolver owns it.
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<i32>;

    fn try_resolve(&mut self, index: i32) -> Option<SharedObject>;
}

/// Substitutes host-owned objects by a GUID.
pub trait ExternalGuidReferenceResolver {
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<Guid>;

    fn try_resolve(&mut self, guid: Guid) -> Option<SharedObject>;
}

/// Substitutes host-owned objects by a string key.
pub trait ExternalStringReferenceResolver {
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<String>;

    fn try_resolve(&mut self, key: &str) -> Option<SharedObject>;
}

/// An index resolver over a list of objects: an object's position is its
/// index.
///
/// ```
/// use vc_serial::context::{ExternalIndexReferenceResolver, IndexedObjects};
/// use vc_serial::reflect::SharedObject;
///
/// let texture = SharedObject::new(String::from("grass.png"));
/// let mut objects = IndexedObjects::new(vec![texture.clone()]);
///
/// assert_eq!(objects.can_reference(&*texture.borrow()), Some(0));
/// assert!(objects.try_resolve(0).unwrap().ptr_eq(&texture));
/// assert!(objects.try_resolve(1).is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct IndexedObjects {
    objects: Vec<SharedObject>,
}

impl IndexedObjects {
    pub fn new(objects: Vec<SharedObject>) -> Self {
        Self { objects }
    }

    /// Appends `object`, returning its index.
    pub fn push(&mut self, object: SharedObject) -> i32 {
        self.objects.push(object);
        (self.objects.len() - 1) as i32
    }

    #[inline]
    pub fn objects(&self) -> &[SharedObject] {
        &self.objects
    }
}

impl ExternalIndexReferenceResolver for IndexedObjects {
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<i32> {
        let index = self.objects.iter().position(|o| o.is_value(value))?;
        i32::try_from(index).ok()
    }

    fn try_resolve(&mut self, index: i32) -> Option<SharedObject> {
        let index = usize::try_from(index).ok()?;
        self.objects.get(index).cloned()
    }
}

/// A resolver over explicit `(key, object)` pairs.
///
/// Keyed by [`Guid`] it is a GUID resolver, keyed by [`String`] a string
/// resolver.
#[derive(Debug, Clone)]
pub struct KeyedObjects<K> {
    entries: Vec<(K, SharedObject)>,
}

impl<K> Default for KeyedObjects<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq> KeyedObjects<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the object under `key`.
    pub fn insert(&mut self, key: K, object: SharedObject) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = object,
            None => self.entries.push((key, object)),
        }
    }

    fn key_of(&self, value: &dyn Reflect) -> Option<&K> {
        self.entries
            .iter()
            .find(|(_, o)| o.is_value(value))
            .map(|(k, _)| k)
    }

    fn get<Q>(&self, key: &Q) -> Option<SharedObject>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, o)| o.clone())
    }
}

impl ExternalGuidReferenceResolver for KeyedObjects<Guid> {
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<Guid> {
        self.key_of(value).copied()
    }

    fn try_resolve(&mut self, guid: Guid) -> Option<SharedObject> {
        self.get(&guid)
    }
}

impl ExternalStringReferenceResolver for KeyedObjects<String> {
    fn can_reference(&mut self, value: &dyn Reflect) -> Option<String> {
        self.key_of(value).cloned()
    }

    fn try_resolve(&mut self, key: &str) -> Option<SharedObject> {
        self.get(key)
    }
}
