use alloc::boxed::Box;
use alloc::string::String;
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
use crate::error::SerializeError;
use crate::formatter::Formatter;
use crate::hash::HashMap;
use crate::info::TypeInfo;
use crate::policy::SerializationPolicy;
use crate::reflect::{Guid, Reflect};
use crate::registry::Registry;

/// State of one write session.
///
/// Owns the object identity table and the external resolver chains. Reset
/// with [`SerializationContext::reset`] to reuse it for the next call; the
/// resolvers, policy and configuration survive a reset.
pub struct SerializationContext {
    registry: Arc<Registry>,
    config: SerializationConfig,
    policy: SerializationPolicy,
    debug: DebugContext,
    binder: Arc<dyn TypeBinder>,
    // pointee address -> internal id
    references: HashMap<usize, i32>,
    next_id: i32,
    index_resolvers: Vec<Box<dyn ExternalIndexReferenceResolver>>,
    guid_resolvers: Vec<Box<dyn ExternalGuidReferenceResolver>>,
    string_resolvers: Vec<Box<dyn ExternalStringReferenceResolver>>,
}

impl SerializationContext {
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
            next_id: 0,
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

    /// Routes this session's reports to `logger`.
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

    /// The name written for `info`.
    #[inline]
    pub fn bind_to_name(&self, info: &'static TypeInfo) -> &'static str {
        self.binder.bind_to_name(info)
    }

    /// The cached dispatcher of `info` under this session's policy.
    #[inline]
    pub fn dispatcher(&self, info: &'static TypeInfo) -> Arc<dyn Dispatcher> {
        self.registry.dispatcher(info, &self.policy)
    }

    /// The cached formatter of `info` under this session's policy.
    #[inline]
    pub fn formatter(&self, info: &'static TypeInfo) -> Arc<dyn Formatter> {
        self.registry.formatter(info, &self.policy)
    }

    // -------------------------------------------------------------------------
    // Internal references

    /// The id already assigned to the object at `address`.
    #[inline]
    pub fn internal_reference(&self, address: usize) -> Option<i32> {
        self.references.get(&address).copied()
    }

    /// Assigns the next id to the object at `address`.
    ///
    /// Returns the existing id instead if the object was already seen.
    pub fn register_internal_reference(&mut self, address: usize) -> i32 {
        *self.references.entry(address).or_insert_with(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        })
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

    /// The first index claimed for `value` along the index chain.
    pub fn external_index(&mut self, value: &dyn Reflect) -> Option<i32> {
        self.index_resolvers
            .iter_mut()
            .find_map(|r| r.can_reference(value))
    }

    pub fn external_guid(&mut self, value: &dyn Reflect) -> Option<Guid> {
        self.guid_resolvers
            .iter_mut()
            .find_map(|r| r.can_reference(value))
    }

    pub fn external_string(&mut self, value: &dyn Reflect) -> Option<String> {
        self.string_resolvers
            .iter_mut()
            .find_map(|r| r.can_reference(value))
    }

    /// Forgets every object seen in the last session.
    pub fn reset(&mut self) {
        self.references.clear();
        self.next_id = 0;
    }
}

impl fmt::Debug for SerializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationContext")
            .field("policy", &self.policy.id())
            .field("references", &self.references.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IndexedObjects;
    use crate::reflect::SharedObject;

    fn context() -> SerializationContext {
        SerializationContext::new(Arc::new(Registry::new()), SerializationConfig::default()).unwrap()
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let mut ctx = context();
        assert_eq!(ctx.register_internal_reference(0x100), 0);
        assert_eq!(ctx.register_internal_reference(0x200), 1);
        assert_eq!(ctx.register_internal_reference(0x100), 0);
        assert_eq!(ctx.internal_reference(0x200), Some(1));

        ctx.reset();
        assert_eq!(ctx.internal_reference(0x200), None);
        assert_eq!(ctx.register_internal_reference(0x200), 0);
    }

    #[test]
    fn resolver_chain_order() {
        let obj = SharedObject::new(3_u32);
        let mut ctx = context();
        ctx.add_index_resolver(IndexedObjects::new(vec![SharedObject::new(9_u32)]));
        ctx.add_index_resolver(IndexedObjects::new(vec![SharedObject::new(8_u32), obj.clone()]));

        assert_eq!(ctx.external_index(&*obj.borrow()), Some(1));
        ctx.clear_resolvers();
        assert_eq!(ctx.external_index(&*obj.borrow()), None);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let config = SerializationConfig {
            policy: "nope".into(),
            ..Default::default()
        };
        let err = SerializationContext::new(Arc::new(Registry::new()), config).unwrap_err();
        assert!(matches!(err, SerializeError::UnknownPolicy { id } if id == "nope"));
    }
}
