use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::dispatch::Dispatcher;
use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter};
use crate::formatter::hooks::{run_deserialize_hook, run_serialize_hook};
use crate::formatter::{Formatter, read_named_entries};
use crate::hash::HashMap;
use crate::info::{FieldInfo, StructInfo, TypeInfo};
use crate::policy::SerializationPolicy;
use crate::reflect::Reflect;
use crate::registry::Registry;

fn write_member(
    field: &FieldInfo,
    dispatcher: &dyn Dispatcher,
    owner: &'static TypeInfo,
    value: &dyn Reflect,
    writer: &mut dyn DataWriter,
) -> SerialResult<()> {
    match field.get(value) {
        Some(member) => dispatcher.write_value(Some(field.name()), member, writer),
        None => writer.debug().log_error(format_args!(
            "member `{}` of `{}` could not be read",
            field.name(),
            owner.type_path()
        )),
    }
}

fn read_member(
    field: &FieldInfo,
    dispatcher: &dyn Dispatcher,
    owner: &'static TypeInfo,
    value: &mut dyn Reflect,
    reader: &mut dyn DataReader,
) -> SerialResult<()> {
    let Some(member) = dispatcher.read_value(reader)? else {
        return Ok(());
    };
    match field.set(value, member) {
        Ok(()) => Ok(()),
        Err(member) => reader.debug().log_error(format_args!(
            "member `{}` of `{}` cannot hold a `{}`",
            field.name(),
            owner.type_path(),
            member.reflect_type_path()
        )),
    }
}

/// Writes members between the serialize hooks.
fn write_with_hooks(
    owner: &'static TypeInfo,
    fields: &StructInfo,
    value: &dyn Reflect,
    writer: &mut dyn DataWriter,
    members: impl FnOnce(&mut dyn DataWriter) -> SerialResult<()>,
) -> SerialResult<()> {
    let hooks = fields.hooks();
    run_serialize_hook(hooks.before_serialize, "before_serialize", owner, value, writer.debug())?;
    members(writer)?;
    run_serialize_hook(hooks.after_serialize, "after_serialize", owner, value, writer.debug())
}

// -----------------------------------------------------------------------------
// ReflectionFormatter

/// Walks the fields of a struct through its [`StructInfo`] on every call.
pub struct ReflectionFormatter {
    info: &'static TypeInfo,
    fields: &'static StructInfo,
    policy: SerializationPolicy,
}

impl ReflectionFormatter {
    pub fn new(info: &'static TypeInfo, fields: &'static StructInfo, policy: SerializationPolicy) -> Self {
        Self { info, fields, policy }
    }
}

impl Formatter for ReflectionFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        write_with_hooks(self.info, self.fields, value, writer, |writer| {
            for field in self.fields.fields() {
                if !self.policy.should_serialize(self.fields, field) {
                    continue;
                }
                let dispatcher = writer.context().dispatcher(field.type_info());
                write_member(field, &*dispatcher, self.info, value, writer)?;
            }
            Ok(())
        })
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        let hooks = self.fields.hooks();
        run_deserialize_hook(hooks.before_deserialize, "before_deserialize", self.info, value, reader.debug())?;
        read_named_entries(reader, self.info, |name, reader| {
            let Some(field) = self.fields.field(name) else {
                return Ok(false);
            };
            if self.policy.should_serialize(self.fields, field) {
                let dispatcher = reader.context().dispatcher(field.type_info());
                read_member(field, &*dispatcher, self.info, &mut *value, reader)?;
            } else {
                reader.skip_entry()?;
            }
            Ok(true)
        })?;
        run_deserialize_hook(hooks.after_deserialize, "after_deserialize", self.info, value, reader.debug())
    }
}

impl fmt::Debug for ReflectionFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionFormatter")
            .field("type", &self.info.type_path())
            .field("policy", &self.policy.id())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// CompiledFormatter

struct Member {
    field: &'static FieldInfo,
    dispatcher: Arc<dyn Dispatcher>,
}

#[derive(Clone, Copy)]
enum Slot {
    Member(usize),
    Excluded,
}

/// A struct formatter whose member plan is computed once.
///
/// The policy is applied and every member dispatcher resolved when the
/// formatter is built, so writing is a straight walk over the plan and
/// reading a single name lookup per entry.
pub struct CompiledFormatter {
    info: &'static TypeInfo,
    fields: &'static StructInfo,
    members: Box<[Member]>,
    // current and former member names
    slots: HashMap<&'static str, Slot>,
}

impl CompiledFormatter {
    pub fn new(
        registry: &Registry,
        info: &'static TypeInfo,
        fields: &'static StructInfo,
        policy: &SerializationPolicy,
    ) -> Self {
        let mut members = Vec::new();
        let mut plan = Vec::with_capacity(fields.field_len());
        for field in fields.fields() {
            let slot = if policy.should_serialize(fields, field) {
                members.push(Member {
                    field,
                    dispatcher: registry.dispatcher(field.type_info(), policy),
                });
                Slot::Member(members.len() - 1)
            } else {
                Slot::Excluded
            };
            plan.push((field, slot));
        }

        let mut slots = HashMap::default();
        for (field, slot) in &plan {
            for former in field.former_names() {
                slots.insert(*former, *slot);
            }
        }
        for (field, slot) in plan {
            slots.insert(field.name(), slot);
        }

        Self {
            info,
            fields,
            members: members.into_boxed_slice(),
            slots,
        }
    }
}

impl Formatter for CompiledFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        write_with_hooks(self.info, self.fields, value, writer, |writer| {
            for member in &self.members {
                write_member(member.field, &*member.dispatcher, self.info, value, writer)?;
            }
            Ok(())
        })
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        let hooks = self.fields.hooks();
        run_deserialize_hook(hooks.before_deserialize, "before_deserialize", self.info, value, reader.debug())?;
        read_named_entries(reader, self.info, |name, reader| {
            match self.slots.get(name) {
                Some(Slot::Member(index)) => {
                    let member = &self.members[*index];
                    read_member(member.field, &*member.dispatcher, self.info, &mut *value, reader)?;
                }
                Some(Slot::Excluded) => reader.skip_entry()?,
                None => return Ok(false),
            }
            Ok(true)
        })?;
        run_deserialize_hook(hooks.after_deserialize, "after_deserialize", self.info, value, reader.debug())
    }
}

impl fmt::Debug for CompiledFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.members.iter().map(|m| m.field.name()).collect();
        f.debug_struct("CompiledFormatter")
            .field("type", &self.info.type_path())
            .field("members", &names)
            .finish()
    }
}
