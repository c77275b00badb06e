//! Object-graph serialization.
//!
//! Writes graphs of reflected values to a binary form, a JSON-like text form
//! or an in-memory node list, and reads them back. Shared handles keep their
//! identity across a round trip, cycles included; types are named in the
//! stream by stable paths so renamed and moved types keep loading.
//!
//! - [`api`]: [`SerializeDriver`](api::SerializeDriver) and
//!   [`DeserializeDriver`](api::DeserializeDriver), the entry points.
//! - [`format`]: the wire formats behind [`DataWriter`](format::DataWriter)
//!   and [`DataReader`](format::DataReader).
//! - [`dispatch`] and [`formatter`]: per-type value and member encoders.
//! - [`registry`] and [`binder`]: process-wide type tables and stream names.
//!
//! ```
//! use std::sync::Arc;
//! use vc_serial::api::{DeserializeDriver, SerializeDriver};
//! use vc_serial::config::{DataFormat, SerializationConfig};
//! use vc_serial::derive::Reflect;
//! use vc_serial::registry::Registry;
//! use vc_serial::Shared;
//!
//! #[derive(Reflect, Default)]
//! struct Node {
//!     pub value: i32,
//!     pub next: Option<Shared<Node>>,
//! }
//!
//! let first = Shared::new(Node { value: 1, next: None });
//! let second = Shared::new(Node { value: 2, next: Some(first.clone()) });
//! first.borrow_mut().next = Some(second.clone());
//!
//! let registry = Arc::new(Registry::new());
//! registry.register::<Node>();
//! let bytes = SerializeDriver::new(registry.clone(), SerializationConfig::default())
//!     .unwrap()
//!     .serialize(&first, DataFormat::Binary)
//!     .unwrap();
//! let back: Shared<Node> = DeserializeDriver::new(registry, SerializationConfig::default())
//!     .unwrap()
//!     .deserialize(&bytes, DataFormat::Binary)
//!     .unwrap();
//!
//! let next = back.borrow().next.clone().unwrap();
//! let again = next.borrow().next.clone().unwrap();
//! assert!(again.same_object(&back));
//! # first.borrow_mut().next = None;
//! # back.borrow_mut().next = None;
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// The derive macro expands to `::vc_serial` paths, in this crate too.
extern crate self as vc_serial;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod api;
pub mod binder;
pub mod config;
pub mod context;
pub mod debug;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod formatter;
pub mod hash;
pub mod info;
pub mod policy;
pub mod reflect;
pub mod registry;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use reflect::Shared;
pub use vc_serial_derive as derive;

#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub mod __macro_exports {
    pub use inventory;
}
