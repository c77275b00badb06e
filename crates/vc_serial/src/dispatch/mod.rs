//! Per-type value encoders.
//!
//! A [`Dispatcher`] handles one declared slot type. It decides how a value
//! enters the stream: as a single primitive entry, a discriminant, a null,
//! a struct node or, for [`Shared`](crate::reflect::Shared) handles, as a
//! reference node, an internal reference or an external reference. Member
//! IO is left to the [`Formatter`](crate::formatter::Formatter) of the
//! concrete type.
//!
//! Dispatchers are stateless and cached per `(type, policy)` by the
//! [`Registry`](crate::registry::Registry).

mod reconcile;
mod shared;
mod value;


use alloc::boxed::Box;
use alloc::sync::Arc;

pub use shared::SharedDispatcher;
pub use value::{EnumDispatcher, OptionDispatcher, PrimitiveDispatcher, ValueDispatcher};

use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter};
use crate::info::{TypeInfo, TypeKind};
use crate::reflect::Reflect;

/// Writes and reads whole values of one declared type.
pub trait Dispatcher: Send + Sync {
    /// The declared slot type.
    fn type_info(&self) -> &'static TypeInfo;

    /// Writes `value` as one entry named `name`.
    fn write_value(
        &self,
        name: Option<&str>,
        value: &dyn Reflect,
        writer: &mut dyn DataWriter,
    ) -> SerialResult<()>;

    /// Reads the next entry as a value of the declared type.
    ///
    /// `None` means the entry could not be turned into a value; the problem
    /// has been reported and the entry consumed, and the caller keeps its
    /// default.
    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>>;
}

/// Picks the dispatcher for a declared type by its kind.
pub fn create(info: &'static TypeInfo) -> Arc<dyn Dispatcher> {
    match info.kind() {
        TypeKind::Primitive(kind) => Arc::new(PrimitiveDispatcher::new(info, *kind)),
        TypeKind::Enum(enum_info) => Arc::new(EnumDispatcher::new(info, enum_info)),
        TypeKind::Option(option) => Arc::new(OptionDispatcher::new(info, option)),
        TypeKind::Shared(shared) => Arc::new(SharedDispatcher::new(info, shared)),
        TypeKind::Struct(_)
        | TypeKind::List(_)
        | TypeKind::Array(_)
        | TypeKind::Map(_)
        | TypeKind::Interface(_) => Arc::new(ValueDispatcher::new(info)),
    }
}
