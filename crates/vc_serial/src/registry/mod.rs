//! Registration of types and the process-wide caches built from them.
//!
//! - [`TypeRegistry`]: every type a stream may name, plus casts,
//!   conversions and former paths.
//! - [`Registry`]: the shared, lock-guarded state sessions are created
//!   from: types, binder, policies, dispatcher and formatter caches,
//!   formatter locators and bindings, the module queue and a buffer pool.
//! - [`ModuleRegistration`]: batches of registrations discovered at link
//!   time (feature `auto_register`) or queued by hand.

mod global;
mod module;
mod pool;
mod type_registry;

pub use global::Registry;
pub use module::ModuleRegistration;
pub use pool::{BufferPool, PooledBuffer};
pub use type_registry::{Conversion, TypeMeta, TypeRegistry};

pub(crate) use type_registry::ResolvedArg;
