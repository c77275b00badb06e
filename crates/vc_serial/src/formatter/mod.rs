//! Member-level encoders.
//!
//! A [`Formatter`] writes and reads the members of one concrete type inside
//! a node the dispatcher already opened. Formatters are located once per
//! `(type, policy)` through this pipeline:
//!
//! 1. locators registered at [`LocatorStep::BeforeRegistered`];
//! 2. the [`FormatterBinding`] table, highest priority first;
//! 3. locators registered at [`LocatorStep::AfterRegistered`];
//! 4. the fallback: [`ReflectionFormatter`] for structs, or
//!    [`CompiledFormatter`] when the registry has compiled formatters
//!    enabled, and a single-member [`ValueFormatter`] for everything else.

mod basic;
mod binding;
mod collections;
mod hooks;
mod structs;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;

pub use basic::{EmptyFormatter, ValueFormatter};
pub use binding::{FormatterBinding, FormatterFactory, TypePattern};
pub use collections::{ArrayFormatter, ListFormatter, MapFormatter, PrimitiveListFormatter};
pub use structs::{CompiledFormatter, ReflectionFormatter};

pub(crate) use binding::builtin_bindings;

use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter};
use crate::info::{TypeInfo, TypeKind};
use crate::policy::SerializationPolicy;
use crate::reflect::Reflect;
use crate::registry::Registry;

/// Writes and reads the members of one concrete type.
pub trait Formatter: Send + Sync {
    fn type_info(&self) -> &'static TypeInfo;

    /// Writes the members of `value` into the open node.
    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()>;

    /// Reads members into `value` until the end of the open node.
    ///
    /// The end marker itself is left for the caller.
    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()>;
}

/// Where a [`FormatterLocator`] runs in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStep {
    /// Before the binding table; can override built-in formatters.
    BeforeRegistered,
    /// After the binding table, before the fallback.
    AfterRegistered,
}

/// A host-provided source of formatters.
///
/// Locators run while the formatter cache is locked for writing and must
/// not ask the registry for formatters themselves.
pub trait FormatterLocator: Send + Sync {
    fn try_locate(
        &self,
        registry: &Registry,
        info: &'static TypeInfo,
        policy: &SerializationPolicy,
    ) -> Option<Arc<dyn Formatter>>;
}

/// Runs the locator pipeline for `info`.
pub(crate) fn locate(
    registry: &Registry,
    info: &'static TypeInfo,
    policy: &SerializationPolicy,
) -> Arc<dyn Formatter> {
    let found = try_locators(registry, LocatorStep::BeforeRegistered, info, policy)
        .or_else(|| {
            registry
                .bindings()
                .iter()
                .find_map(|binding| binding.build(info, policy))
        })
        .or_else(|| try_locators(registry, LocatorStep::AfterRegistered, info, policy));
    if let Some(formatter) = found {
        return formatter;
    }

    log::trace!(
        target: crate::debug::LOG_TARGET,
        "no formatter bound to `{}`, using the fallback",
        info.type_path()
    );
    match info.kind() {
        TypeKind::Struct(fields) if registry.compiled_formatters() => {
            Arc::new(CompiledFormatter::new(registry, info, fields, policy))
        }
        TypeKind::Struct(fields) => Arc::new(ReflectionFormatter::new(info, fields, policy.clone())),
        TypeKind::List(list) => Arc::new(ListFormatter::new(info, list)),
        TypeKind::Array(array) => Arc::new(ArrayFormatter::new(info, array)),
        TypeKind::Map(map) => Arc::new(MapFormatter::new(info, map)),
        TypeKind::Interface(_) => Arc::new(EmptyFormatter::new(info)),
        TypeKind::Primitive(_) | TypeKind::Enum(_) | TypeKind::Option(_) | TypeKind::Shared(_) => {
            Arc::new(ValueFormatter::new(info))
        }
    }
}

fn try_locators(
    registry: &Registry,
    step: LocatorStep,
    info: &'static TypeInfo,
    policy: &SerializationPolicy,
) -> Option<Arc<dyn Formatter>> {
    registry
        .locators(step)
        .iter()
        .find_map(|locator| locator.try_locate(registry, info, policy))
}

/// Reads the named entries of the open node until its end marker.
///
/// `member` reads the entry of a name it knows and returns `false` for
/// any other name, which is then reported and skipped. Aborts once more
/// than `max_node_entries` entries were seen.
pub(crate) fn read_named_entries(
    reader: &mut dyn DataReader,
    owner: &'static TypeInfo,
    mut member: impl FnMut(&str, &mut dyn DataReader) -> SerialResult<bool>,
) -> SerialResult<()> {
    let limit = reader.context().config().max_node_entries;
    let mut count = 0usize;
    loop {
        let entry = reader.peek_entry()?;
        if entry.kind.is_end_marker() {
            return Ok(());
        }
        count += 1;
        if count > limit {
            let abort = reader.debug().abort(alloc::format!(
                "more than {limit} entries in one `{}` node, the stream is likely corrupt",
                owner.type_path()
            ));
            return Err(abort);
        }
        let Some(name) = entry.name.as_deref() else {
            reader.skip_unexpected("a named entry", &entry)?;
            continue;
        };
        if !member(name, reader)? {
            reader.debug().log_warning(format_args!(
                "`{}` has no member `{name}`, skipping it",
                owner.type_path()
            ))?;
            reader.skip_entry()?;
        }
    }
}
