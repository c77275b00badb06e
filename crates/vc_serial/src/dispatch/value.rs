use alloc::boxed::Box;

use crate::dispatch::Dispatcher;
use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter, EntryType};
use crate::info::{EnumInfo, OptionInfo, PrimitiveKind, TypeInfo};
use crate::reflect::Reflect;

// -----------------------------------------------------------------------------
// PrimitiveDispatcher

/// Single primitive entries.
#[derive(Debug)]
pub struct PrimitiveDispatcher {
    info: &'static TypeInfo,
    kind: PrimitiveKind,
}

impl PrimitiveDispatcher {
    pub fn new(info: &'static TypeInfo, kind: PrimitiveKind) -> Self {
        Self { info, kind }
    }
}

impl Dispatcher for PrimitiveDispatcher {
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
        if writer.write_primitive(name, value)? {
            return Ok(());
        }
        writer.debug().log_error(format_args!(
            "a `{}` was handed to the dispatcher of `{}`",
            value.reflect_type_path(),
            self.info.type_path()
        ))?;
        writer.write_null(name)
    }

    #[inline]
    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        reader.read_primitive(self.kind)
    }
}

// -----------------------------------------------------------------------------
// EnumDispatcher

/// Field-less enums, written as their `i64` discriminant.
#[derive(Debug)]
pub struct EnumDispatcher {
    info: &'static TypeInfo,
    enum_info: &'static EnumInfo,
}

impl EnumDispatcher {
    pub fn new(info: &'static TypeInfo, enum_info: &'static EnumInfo) -> Self {
        Self { info, enum_info }
    }
}

impl Dispatcher for EnumDispatcher {
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
        match self.enum_info.discriminant_of(value) {
            Some(discriminant) => writer.write_i64(name, discriminant),
            None => {
                writer.debug().log_error(format_args!(
                    "a `{}` was handed to the dispatcher of `{}`",
                    value.reflect_type_path(),
                    self.info.type_path()
                ))?;
                writer.write_null(name)
            }
        }
    }

    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let Some(discriminant) = reader.read_i64()? else {
            return Ok(None);
        };
        let value = self.enum_info.from_discriminant(discriminant);
        if value.is_none() {
            reader.debug().log_warning(format_args!(
                "`{}` has no variant with discriminant {discriminant}",
                self.info.type_path()
            ))?;
        }
        Ok(value)
    }
}

// -----------------------------------------------------------------------------
// OptionDispatcher

/// `Option<T>`: `None` is a null entry, `Some` is whatever `T` writes.
///
/// When `T` is an option itself, `Some` is a struct node holding the inner
/// value as [`NESTED_SOME`], so `Some(None)` stays apart from `None`.
#[derive(Debug)]
pub struct OptionDispatcher {
    info: &'static TypeInfo,
    option: &'static OptionInfo,
}

/// Member name of the payload of a nested `Some`.
pub const NESTED_SOME: &str = "some";

impl OptionDispatcher {
    pub fn new(info: &'static TypeInfo, option: &'static OptionInfo) -> Self {
        Self { info, option }
    }

    #[inline]
    fn is_nested(&self) -> bool {
        self.option.some().as_option().is_some()
    }

    fn read_some(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let dispatcher = reader.context().dispatcher(self.option.some());
        if !self.is_nested() {
            return dispatcher.read_value(reader);
        }
        if reader.enter_node()?.is_none() {
            let entry = reader.peek_entry()?;
            reader.skip_unexpected("a nested option", &entry)?;
            return Ok(None);
        }
        let inner = dispatcher.read_value(reader)?;
        reader.exit_node()?;
        Ok(inner)
    }
}

impl Dispatcher for OptionDispatcher {
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
        match self.option.get(value) {
            Some(inner) => {
                let dispatcher = writer.context().dispatcher(self.option.some());
                if !self.is_nested() {
                    return dispatcher.write_value(name, inner, writer);
                }
                writer.begin_struct_node(name, None)?;
                dispatcher.write_value(Some(NESTED_SOME), inner, writer)?;
                writer.end_node()
            }
            None => writer.write_null(name),
        }
    }

    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        if reader.read_null()? {
            return Ok(Some(self.option.none()));
        }
        let Some(inner) = self.read_some(reader)? else {
            return Ok(None);
        };
        match self.option.wrap_some(inner) {
            Ok(value) => Ok(Some(value)),
            Err(inner) => {
                reader.debug().log_error(format_args!(
                    "read a `{}` where `{}` was expected",
                    inner.reflect_type_path(),
                    self.option.some().type_path()
                ))?;
                Ok(None)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ValueDispatcher

/// Structs and collections: a struct node without identity around the
/// members written by the type's formatter.
#[derive(Debug)]
pub struct ValueDispatcher {
    info: &'static TypeInfo,
}

impl ValueDispatcher {
    pub fn new(info: &'static TypeInfo) -> Self {
        Self { info }
    }
}

impl Dispatcher for ValueDispatcher {
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
        let formatter = writer.context().formatter(self.info);
        writer.begin_struct_node(name, None)?;
        formatter.write_members(value, writer)?;
        writer.end_node()
    }

    fn read_value(&self, reader: &mut dyn DataReader) -> SerialResult<Option<Box<dyn Reflect>>> {
        let entry = reader.peek_entry()?;
        if entry.kind != EntryType::StartOfNode {
            reader.skip_unexpected("a node", &entry)?;
            return Ok(None);
        }
        reader.enter_node()?;

        let Some(mut value) = self.info.create_value() else {
            reader.debug().log_error(format_args!(
                "`{}` has no default value to read into",
                self.info.type_path()
            ))?;
            reader.exit_node()?;
            return Ok(None);
        };
        let formatter = reader.context().formatter(self.info);
        formatter.read_members(&mut *value, reader)?;
        reader.exit_node()?;
        Ok(Some(value))
    }
}
