use alloc::boxed::Box;
use core::fmt;

use crate::dispatch::Dispatcher;
use crate::dispatch::reconcile::{Reconciliation, reconcile};
use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter, EntryType, NodeHeader};
use crate::info::{SharedInfo, TypeInfo};
use crate::reflect::{Reflect, SharedObject};

/// [`Shared`](crate::reflect::Shared) handles: the reference machinery.
///
/// On write, a pointee is tried against the external resolvers (index,
/// then GUID, then string), then against the objects already written in
/// this session, and only then written in full as a reference node with a
/// fresh internal id. The node carries a type name when the pointee is not
/// exactly the declared target.
///
/// Primitive pointees behind an interface target skip all of this and are
/// written as a bare primitive entry.
pub struct SharedDispatcher {
    info: &'static TypeInfo,
    shared: &'static SharedInfo,
}

impl SharedDispatcher {
    pub fn new(info: &'static TypeInfo, shared: &'static SharedInfo) -> Self {
        Self { info, shared }
    }

    /// Wraps `object` into a handle of the declared type.
    fn adopt(
        &self,
        object: SharedObject,
        reader: &mut dyn DataReader,
    ) -> SerialResult<Option<Box<dyn Reflect>>> {
        let adopted = self
            .shared
            .from_object(object, &reader.context().registry().types());
        match adopted {
            Ok(handle) => Ok(Some(handle)),
            Err(object) => {
                reader.debug().log_warning(format_args!(
                    "a `{}` cannot be stored in `{}`",
                    object.type_info().type_path(),
                    self.info.type_path()
                ))?;
                Ok(None)
            }
        }
    }

    fn adopt_external(
        &self,
        found: Option<SharedObject>,
        what: fmt::Arguments<'_>,
        reader: &mut dyn DataReader,
    ) -> SerialResult<Option<Box<dyn Reflect>>> {
        match found {
            Some(object) => self.adopt(object, reader),
            None => {
                reader
                    .debug()
                    .log_warning(format_args!("no resolver knows the external object {what}"))?;
                Ok(None)
            }
        }
    }

    fn read_primitive(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let target = self.shared.target();
        let value = match target.as_primitive() {
            Some(kind) => reader.read_primitive(kind)?,
            None => reader.read_boxed_primitive()?,
        };
        let Some(value) = value else {
            return Ok(None);
        };
        match value.reflect_type_info().wrap_shared(value) {
            Ok(object) => self.adopt(object, reader),
            Err(value) => {
                reader.debug().log_error(format_args!(
                    "a `{}` cannot be moved into a shared object",
                    value.reflect_type_path()
                ))?;
                Ok(None)
            }
        }
    }

    fn read_node(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let Some(header) = reader.enter_node()? else {
            return Ok(None);
        };
        let value = self.read_node_body(&header, reader)?;
        reader.exit_node()?;
        Ok(value)
    }

    fn read_node_body(
        &self,
        header: &NodeHeader,
        reader: &mut dyn DataReader,
    ) -> SerialResult<Option<Box<dyn Reflect>>> {
        let declared = self.shared.target();
        match reconcile(reader.context(), declared, header)? {
            Reconciliation::Embedded(info) | Reconciliation::Forced(info) => {
                let Some(object) = info.create_shared() else {
                    reader.debug().log_error(format_args!(
                        "`{}` has no default value to read into",
                        info.type_path()
                    ))?;
                    return self.substitute(header, reader);
                };
                // Registered first so that cycles back to this node resolve.
                register(header, &object, reader)?;
                populate(&object, info, reader)?;
                self.adopt(object, reader)
            }
            Reconciliation::Convert(from, conversion) => {
                let Some(mut value) = from.create_value() else {
                    reader.debug().log_error(format_args!(
                        "`{}` has no default value to read into",
                        from.type_path()
                    ))?;
                    return self.substitute(header, reader);
                };
                let formatter = reader.context().formatter(from);
                formatter.read_members(&mut *value, reader)?;

                let converted = match conversion(value) {
                    Ok(converted) => converted,
                    Err(_) => {
                        reader.debug().log_warning(format_args!(
                            "converting `{}` into `{}` failed",
                            from.type_path(),
                            declared.type_path()
                        ))?;
                        return self.substitute(header, reader);
                    }
                };
                match declared.wrap_shared(converted) {
                    Ok(object) => {
                        register(header, &object, reader)?;
                        self.adopt(object, reader)
                    }
                    Err(converted) => {
                        reader.debug().log_error(format_args!(
                            "conversion into `{}` produced a `{}`",
                            declared.type_path(),
                            converted.reflect_type_path()
                        ))?;
                        self.substitute(header, reader)
                    }
                }
            }
            Reconciliation::Drop => self.substitute(header, reader),
        }
    }

    /// A default object in place of a dropped node, bound to the node's id
    /// so later references to it still resolve.
    fn substitute(
        &self,
        header: &NodeHeader,
        reader: &mut dyn DataReader,
    ) -> SerialResult<Option<Box<dyn Reflect>>> {
        match self.shared.target().create_shared() {
            Some(object) => {
                register(header, &object, reader)?;
                self.adopt(object, reader)
            }
            None => Ok(None),
        }
    }
}

fn register(header: &NodeHeader, object: &SharedObject, reader: &mut dyn DataReader) -> SerialResult<()> {
    if header.id < 0 {
        return Ok(());
    }
    reader
        .context_mut()
        .register_internal_reference(header.id, object.clone())
}

fn populate(
    object: &SharedObject,
    info: &'static TypeInfo,
    reader: &mut dyn DataReader,
) -> SerialResult<()> {
    let formatter = reader.context().formatter(info);
    match object.try_borrow_mut() {
        Ok(mut value) => formatter.read_members(&mut *value, reader),
        Err(_) => reader.debug().log_error(format_args!(
            "a `{}` is borrowed while its members are read",
            info.type_path()
        )),
    }
}

impl Dispatcher for SharedDispatcher {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_value(
        &self,
        name: Option<&str>,
        value: &dyn Reflect,
        writer: &mut dyn DataWriter,
    ) -> SerialResult<()> {
        let Some(view) = self.shared.view(value) else {
            writer.debug().log_error(format_args!(
                "the pointee of a `{}` is mutably borrowed, writing null",
                self.info.type_path()
            ))?;
            return writer.write_null(name);
        };
        let pointee: &dyn Reflect = &*view.value;
        let concrete = pointee.reflect_type_info();
        let target = self.shared.target();

        if !target.is_concrete() && concrete.as_primitive().is_some() {
            writer.write_primitive(name, pointee)?;
            return Ok(());
        }

        let context = writer.context_mut();
        if let Some(index) = context.external_index(pointee) {
            return writer.write_external_reference_index(name, index);
        }
        if let Some(guid) = context.external_guid(pointee) {
            return writer.write_external_reference_guid(name, guid);
        }
        if let Some(key) = context.external_string(pointee) {
            return writer.write_external_reference_string(name, &key);
        }
        if let Some(id) = context.internal_reference(view.address) {
            return writer.write_internal_reference(name, id);
        }

        let id = context.register_internal_reference(view.address);
        let formatter = context.formatter(concrete);
        let ty = (concrete.type_id() != target.type_id()).then_some(concrete);
        writer.begin_reference_node(name, ty, id)?;
        formatter.write_members(pointee, writer)?;
        writer.end_node()
    }

    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let entry = reader.peek_entry()?;
        match entry.kind {
            EntryType::Null => {
                reader.read_null()?;
                Ok(None)
            }
            EntryType::InternalReference => {
                let Some(id) = reader.read_internal_reference()? else {
                    return Ok(None);
                };
                match reader.context().internal_reference(id) {
                    Some(object) => self.adopt(object, reader),
                    None => {
                        reader.debug().log_error(format_args!(
                            "internal reference {id} points at no object read so far"
                        ))?;
                        Ok(None)
                    }
                }
            }
            EntryType::ExternalReferenceByIndex => {
                let Some(index) = reader.read_external_reference_index()? else {
                    return Ok(None);
                };
                let found = reader.context_mut().resolve_external_index(index);
                self.adopt_external(found, format_args!("with index {index}"), reader)
            }
            EntryType::ExternalReferenceByGuid => {
                let Some(guid) = reader.read_external_reference_guid()? else {
                    return Ok(None);
                };
                let found = reader.context_mut().resolve_external_guid(guid);
                self.adopt_external(found, format_args!("with guid {guid}"), reader)
            }
            EntryType::ExternalReferenceByString => {
                let Some(key) = reader.read_external_reference_string()? else {
                    return Ok(None);
                };
                let found = reader.context_mut().resolve_external_string(&key);
                self.adopt_external(found, format_args!("with key `{key}`"), reader)
            }
            EntryType::StartOfNode => self.read_node(reader),
            kind if kind.is_primitive() => self.read_primitive(reader),
            _ => {
                reader.skip_unexpected("a shared object", &entry)?;
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for SharedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDispatcher")
            .field("type", &self.info.type_path())
            .finish()
    }
}
