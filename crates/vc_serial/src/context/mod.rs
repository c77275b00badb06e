//! Per-session state: identity tables, external resolver chains, and the
//! policy, configuration and error channel of one serialize or deserialize
//! call.

mod deserialize;
mod resolver;
mod serialize;

pub use deserialize::DeserializationContext;
pub use resolver::{
    ExternalGuidReferenceResolver, ExternalIndexReferenceResolver, ExternalStringReferenceResolver,
    IndexedObjects, KeyedObjects,
};
pub use serialize::SerializationContext;
