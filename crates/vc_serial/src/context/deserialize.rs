use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::binder::TypeBinder;
use crate::config::SerializationConfig;
use crate::context::{
    ExternalGuidReferenceResolver, ExternalIndexReferenceResolver, ExternalStringReferenceResolver,
};
use crate::debug::{DebugContext, SerializationLogger};
use crate::dispatch::Dispatcher;
use crate::error::{SerialResult, SerializeError};
use crate::formatter::Formatter;
use crate::hash::HashMap;
use crate::info::TypeInfo;
use crate::policy::SerializationPolicy;
use crate::reflect::{Guid, SharedObject};
use crate::registry::Registry;

/// State of one read session.
///
/// Maps the internal ids of the stream to the objects built for them, so
/// every later reference to an id yields the same allocation.
pub struct DeserializationContext {
    registry: Arc<Registry>,
    config: SerializationConfig,
    policy: SerializationPolicy,
    debug: DebugContext,
    binder: Arc<dyn TypeBinder>,
    references: HashMap<i32, SharedObject>,
    index_resolvers: Vec<Box<dyn ExternalIndexReferenceResolver>>,
    guid_resolvers: Vec<Box<dyn ExternalGuidReferenceResolver>>,
    string_resolvers: Vec<Box<dyn ExternalStringReferenceResolver>>,
}

impl DeserializationContext {
    /// Creates a context for `config`.
    ///
    /// Fails if `config.policy` names a policy the registry does not know.
    pub fn new(registry: Arc<Registry>, config: SerializationConfig) -> Result<Self, SerializeError> {
        let policy = registry
            .policy(&config.policy)
            .ok_or_else(|| SerializeError::UnknownPolicy {
                id: config.policy.clone(),
            })?;
        Ok(Self {
            binder: registry.binder(),
            debug: config.debug_context(),
            registry,
            config,
            policy,
            references: HashMap::default(),
            index_resolvers: Vec::new(),
            guid_resolvers: Vec::new(),
            string_resolvers: Vec::new(),
        })
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &SerializationConfig {
        &self.config
    }

    #[inline]
    pub fn policy(&self) -> &SerializationPolicy {
        &self.policy
    }

    #[inline]
    pub fn debug(&self) -> &DebugContext {
        &self.debug
    }

    pub fn set_logger(&mut self, logger: Arc<dyn SerializationLogger>) {
        self.debug = self.debug.clone().with_logger(logger);
    }

    pub fn set_binder(&mut self, binder: Arc<dyn TypeBinder>) {
        self.binder = binder;
    }

    #[inline]
    pub fn binder(&self) -> &dyn TypeBinder {
        &*self.binder
    }

    /// Resolves a type name read from the stream.
    ///
    /// On a miss, modules queued since the last lookup are applied and the
    /// lookup is tried once more.
    pub fn bind_to_type(&self, name: &str) -> Option<&'static TypeInfo> {
        let found = self.binder.bind_to_type(&self.registry.types(), name);
        if found.is_some() || !self.registry.process_pending_modules() {
            return found;
        }
        self.binder.bind_to_type(&self.registry.types(), name)
    }

    #[inline]
    pub fn dispatcher(&self, info: &'static TypeInfo) -> Arc<dyn Dispatcher> {
        self.registry.dispatcher(info, &self.policy)
    }

    #[inline]
    pub fn formatter(&self, info: &'static TypeInfo) -> Arc<dyn Formatter> {
        self.registry.formatter(info, &self.policy)
    }

    // -------------------------------------------------------------------------
    // Internal references

    /// Binds `id` to `object`.
    ///
    /// A duplicate id is reported and the first binding wins. The report
    /// aborts the session under the throwing error modes.
    pub fn register_internal_reference(&mut self, id: i32, object: SharedObject) -> SerialResult<()> {
        use hashbrown::hash_map::Entry;

        match self.references.entry(id) {
            Entry::Occupied(_) => self
                .debug
                .log_error(format_args!("internal reference id {id} is bound twice")),
            Entry::Vacant(slot) => {
                slot.insert(object);
                Ok(())
            }
        }
    }

    #[inline]
    pub fn internal_reference(&self, id: i32) -> Option<SharedObject> {
        self.references.get(&id).cloned()
    }

    // -------------------------------------------------------------------------
    // External references

    pub fn add_index_resolver(&mut self, resolver: impl ExternalIndexReferenceResolver + 'static) {
        self.index_resolvers.push(Box::new(resolver));
    }

    pub fn add_guid_resolver(&mut self, resolver: impl ExternalGuidReferenceResolver + 'static) {
        self.guid_resolvers.push(Box::new(resolver));
    }

    pub fn add_string_resolver(&mut self, resolver: impl ExternalStringReferenceResolver + 'static) {
        self.string_resolvers.push(Box::new(resolver));
    }

    pub fn clear_resolvers(&mut self) {
        self.index_resolvers.clear();
        self.guid_resolvers.clear();
        self.string_resolvers.clear();
    }

    pub fn resolve_external_index(&mut self, index: i32) -> Option<SharedObject> {
        self.index_resolvers
            .iter_mut()
            .find_map(|r| r.try_resolve(index))
    }

    pub fn resolve_external_guid(&mut self, guid: Guid) -> Option<SharedObject> {
        self.guid_resolvers
            .iter_mut()
            .find_map(|r| r.try_resolve(guid))
    }

    pub fn resolve_external_string(&mut self, key: &str) -> Option<SharedObject> {
        self.string_resolvers
            .iter_mut()
            .find_map(|r| r.try_resolve(key))
    }

    /// Forgets every object built in the last session.
    pub fn reset(&mut self) {
        self.references.clear();
    }
}

impl fmt::Debug for DeserializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializationContext")
            .field("policy", &self.policy.id())
            .field("references", &self.references.len())
            .finish_non_exhaustive()
    }
}
