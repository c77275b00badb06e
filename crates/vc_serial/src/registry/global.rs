use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::binder::{DefaultTypeBinder, TypeBinder};
use crate::dispatch::{self, Dispatcher};
use crate::formatter::{self, Formatter, FormatterBinding, FormatterLocator, LocatorStep};
use crate::hash::{HashMap, TypeIdMap};
use crate::info::{TypeInfo, Typed};
use crate::policy::SerializationPolicy;
use crate::registry::{BufferPool, ModuleRegistration, TypeRegistry};

type Cache<T> = RwLock<HashMap<String, TypeIdMap<Arc<T>>>>;

/// Process-wide state shared by every session.
///
/// Holds the [`TypeRegistry`], the active binder, the member-selection
/// policies, the dispatcher and formatter caches, the formatter locator and
/// binding tables, the module queue and the scratch buffer pool.
///
/// Cache entries are built at most once, under the write lock of their
/// cache, and live as long as the registry. Formatter locators run under
/// that lock and must not resolve formatters themselves.
pub struct Registry {
    types: RwLock<TypeRegistry>,
    binder: RwLock<Arc<dyn TypeBinder>>,
    policies: RwLock<HashMap<String, SerializationPolicy>>,
    dispatchers: Cache<dyn Dispatcher>,
    formatters: Cache<dyn Formatter>,
    locators: RwLock<Vec<(LocatorStep, Arc<dyn FormatterLocator>)>>,
    bindings: RwLock<Vec<FormatterBinding>>,
    modules: Mutex<ModuleQueue>,
    buffers: BufferPool,
    compiled_formatters: AtomicBool,
}

#[derive(Default)]
struct ModuleQueue {
    discovered: bool,
    pending: Vec<ModuleRegistration>,
    processed: Vec<&'static str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with the primitive types, the built-in policies
    /// and formatter bindings, and every module submitted at link time.
    pub fn new() -> Self {
        let mut policies = HashMap::default();
        for policy in [
            SerializationPolicy::permissive(),
            SerializationPolicy::strict(),
            SerializationPolicy::standard(),
        ] {
            policies.insert(String::from(policy.id()), policy);
        }

        let mut bindings = formatter::builtin_bindings();
        bindings.sort_by_key(|b| core::cmp::Reverse(b.priority()));

        let registry = Self {
            types: RwLock::new(TypeRegistry::new()),
            binder: RwLock::new(Arc::new(DefaultTypeBinder::new())),
            policies: RwLock::new(policies),
            dispatchers: RwLock::default(),
            formatters: RwLock::default(),
            locators: RwLock::default(),
            bindings: RwLock::new(bindings),
            modules: Mutex::default(),
            buffers: BufferPool::new(),
            compiled_formatters: AtomicBool::new(false),
        };
        registry.process_pending_modules();
        registry
    }

    /// The registry shared by sessions that were not given one.
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::new())).clone()
    }

    // -------------------------------------------------------------------------
    // Types

    /// Takes a read lock on the type registry.
    pub fn types(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.types.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the type registry.
    pub fn types_mut(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.types.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `T` and every type it depends on.
    #[inline]
    pub fn register<T: Typed + ?Sized>(&self) {
        self.types_mut().register::<T>();
    }

    // -------------------------------------------------------------------------
    // Binder

    /// The binder new sessions start with.
    pub fn binder(&self) -> Arc<dyn TypeBinder> {
        self.binder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_binder(&self, binder: Arc<dyn TypeBinder>) {
        *self.binder.write().unwrap_or_else(PoisonError::into_inner) = binder;
    }

    // -------------------------------------------------------------------------
    // Policies

    pub fn policy(&self, id: &str) -> Option<SerializationPolicy> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Makes `policy` selectable by its id.
    ///
    /// Returns `false` and keeps the existing policy if the id is taken;
    /// caches keyed by the id would otherwise go stale.
    pub fn register_policy(&self, policy: SerializationPolicy) -> bool {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        if policies.contains_key(policy.id()) {
            return false;
        }
        policies.insert(String::from(policy.id()), policy);
        true
    }

    // -------------------------------------------------------------------------
    // Dispatchers and formatters

    /// The dispatcher of `info` under `policy`.
    pub fn dispatcher(&self, info: &'static TypeInfo, policy: &SerializationPolicy) -> Arc<dyn Dispatcher> {
        cached(&self.dispatchers, info, policy, || dispatch::create(info))
    }

    /// The formatter of `info` under `policy`, located on first use.
    pub fn formatter(&self, info: &'static TypeInfo, policy: &SerializationPolicy) -> Arc<dyn Formatter> {
        cached(&self.formatters, info, policy, || {
            formatter::locate(self, info, policy)
        })
    }

    /// Adds a locator consulted at `step` of the formatter pipeline.
    ///
    /// Types whose formatter was already located are not affected.
    pub fn add_locator(&self, step: LocatorStep, locator: impl FormatterLocator + 'static) {
        self.locators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((step, Arc::new(locator)));
    }

    /// Locators of `step`, in insertion order.
    pub(crate) fn locators(&self, step: LocatorStep) -> Vec<Arc<dyn FormatterLocator>> {
        self.locators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, locator)| locator.clone())
            .collect()
    }

    /// Adds a static formatter binding. Higher priorities are tried first;
    /// equal priorities keep insertion order.
    pub fn add_binding(&self, binding: FormatterBinding) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let at = bindings.partition_point(|b| b.priority() >= binding.priority());
        bindings.insert(at, binding);
    }

    pub(crate) fn bindings(&self) -> RwLockReadGuard<'_, Vec<FormatterBinding>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether struct formatters precompute their member plan.
    #[inline]
    pub fn compiled_formatters(&self) -> bool {
        self.compiled_formatters.load(Ordering::Relaxed)
    }

    /// Selects precomputed member plans for structs located from now on.
    pub fn set_compiled_formatters(&self, enabled: bool) {
        self.compiled_formatters.store(enabled, Ordering::Relaxed);
    }

    // -------------------------------------------------------------------------
    // Modules

    /// Queues `module` for the next [`process_pending_modules`] call.
    ///
    /// A module name is only ever processed once.
    ///
    /// [`process_pending_modules`]: Self::process_pending_modules
    pub fn enqueue_module(&self, module: ModuleRegistration) {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .push(module);
    }

    /// Queues every module submitted with [`register_module!`] that has not
    /// been seen yet.
    ///
    /// [`register_module!`]: crate::register_module
    pub fn discover_modules(&self) {
        let mut queue = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.discovered {
            return;
        }
        queue.discovered = true;
        #[cfg(feature = "auto_register")]
        queue
            .pending
            .extend(inventory::iter::<ModuleRegistration>.into_iter().copied());
    }

    /// Applies every queued module to the type registry.
    ///
    /// Returns `true` if at least one new module was applied.
    pub fn process_pending_modules(&self) -> bool {
        self.discover_modules();
        let pending = {
            let mut queue = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
            let pending = core::mem::take(&mut queue.pending);
            let mut fresh = Vec::with_capacity(pending.len());
            for module in pending {
                if !queue.processed.contains(&module.name()) {
                    queue.processed.push(module.name());
                    fresh.push(module);
                }
            }
            fresh
        };
        if pending.is_empty() {
            return false;
        }
        let mut types = self.types_mut();
        for module in &pending {
            log::debug!(target: crate::debug::LOG_TARGET, "registering module `{}`", module.name());
            module.apply(&mut types);
        }
        true
    }

    // -------------------------------------------------------------------------
    // Buffers

    #[inline]
    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }
}

/// Looks `info` up in `cache`, building the entry under the write lock if
/// it is missing.
fn cached<T: ?Sized>(
    cache: &Cache<T>,
    info: &'static TypeInfo,
    policy: &SerializationPolicy,
    build: impl FnOnce() -> Arc<T>,
) -> Arc<T> {
    let type_id = info.type_id();
    {
        let read = cache.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = read.get(policy.id()).and_then(|m| m.get(&type_id)) {
            return found.clone();
        }
    }
    let mut write = cache.write().unwrap_or_else(PoisonError::into_inner);
    let per_policy = write.entry(String::from(policy.id())).or_default();
    if let Some(found) = per_policy.get(&type_id) {
        return found.clone();
    }
    let built = build();
    per_policy.insert(type_id, built.clone());
    built
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &*self.types())
            .field("compiled_formatters", &self.compiled_formatters())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::*;
    use crate::registry::TypeRegistry;

    #[test]
    fn builtin_policies_are_registered() {
        let registry = Registry::new();
        assert!(registry.policy(crate::policy::STRICT).is_some());
        assert!(registry.policy("custom").is_none());

        let custom = SerializationPolicy::new("custom", true, |_, _| true);
        assert!(registry.register_policy(custom));
        assert!(!registry.register_policy(SerializationPolicy::new("custom", false, |_, _| false)));
        assert!(registry.policy("custom").unwrap().allow_non_serializable_types());
    }

    #[test]
    fn caches_return_the_same_instance() {
        let registry = Registry::new();
        let policy = SerializationPolicy::standard();
        let info = <Vec<u32>>::type_info();

        let a = registry.dispatcher(info, &policy);
        let b = registry.dispatcher(info, &policy);
        assert!(Arc::ptr_eq(&a, &b));

        let a = registry.formatter(info, &policy);
        let b = registry.formatter(info, &policy);
        assert!(Arc::ptr_eq(&a, &b));
        let other = registry.formatter(info, &SerializationPolicy::strict());
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn modules_apply_once() {
        fn register(types: &mut TypeRegistry) {
            types.register::<Vec<i8>>();
            types.add_former_path("old::Bytes", TypeId::of::<Vec<i8>>());
        }

        let registry = Registry::new();
        registry.enqueue_module(ModuleRegistration::new("test::bytes", register));
        registry.enqueue_module(ModuleRegistration::new("test::bytes", register));
        assert!(registry.process_pending_modules());
        assert!(!registry.process_pending_modules());
        assert_eq!(
            registry.types().get_with_former_path("old::Bytes").map(TypeInfo::type_id),
            Some(TypeId::of::<Vec<i8>>())
        );
    }
}
