use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter};
use crate::formatter::{Formatter, read_named_entries};
use crate::info::TypeInfo;
use crate::reflect::Reflect;

/// Member name used by [`ValueFormatter`].
const VALUE: &str = "value";

/// Writes no members and ignores whatever the node holds.
///
/// Used for interface targets and for types the active policy refuses to
/// serialize.
#[derive(Debug)]
pub struct EmptyFormatter {
    info: &'static TypeInfo,
}

impl EmptyFormatter {
    pub fn new(info: &'static TypeInfo) -> Self {
        Self { info }
    }
}

impl Formatter for EmptyFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, _: &dyn Reflect, _: &mut dyn DataWriter) -> SerialResult<()> {
        Ok(())
    }

    fn read_members(&self, _: &mut dyn Reflect, _: &mut dyn DataReader) -> SerialResult<()> {
        Ok(())
    }
}

/// Stores the whole value as one member named `value`.
///
/// This is how primitives, enums and options behind a shared handle get a
/// node of their own.
#[derive(Debug)]
pub struct ValueFormatter {
    info: &'static TypeInfo,
}

impl ValueFormatter {
    pub fn new(info: &'static TypeInfo) -> Self {
        Self { info }
    }
}

impl Formatter for ValueFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        let dispatcher = writer.context().dispatcher(self.info);
        dispatcher.write_value(Some(VALUE), value, writer)
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        read_named_entries(reader, self.info, |name, reader| {
            if name != VALUE {
                return Ok(false);
            }
            let dispatcher = reader.context().dispatcher(self.info);
            if let Some(read) = dispatcher.read_value(reader)?
                && let Err(read) = self.info.assign(&mut *value, read)
            {
                reader.debug().log_error(format_args!(
                    "a `{}` cannot be stored in a `{}`",
                    read.reflect_type_path(),
                    self.info.type_path()
                ))?;
            }
            Ok(true)
        })
    }
}
