use alloc::boxed::Box;

use crate::error::SerialResult;
use crate::format::{DataReader, DataWriter, EntryType};
use crate::formatter::{Formatter, read_named_entries};
use crate::info::{ArrayInfo, ListInfo, MapInfo, PrimitiveListAccess, TypeInfo};
use crate::reflect::Reflect;

const KEY: &str = "$k";
const VALUE: &str = "$v";

/// Collection lengths travel as `i64`.
#[inline]
fn wire_len(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

// -----------------------------------------------------------------------------
// ListFormatter

/// Growable collections, as an array of unnamed items.
///
/// Reading also accepts a primitive array, so a list written as a `Vec` of
/// primitives can be read back into any other list type.
#[derive(Debug)]
pub struct ListFormatter {
    info: &'static TypeInfo,
    list: &'static ListInfo,
}

impl ListFormatter {
    pub fn new(info: &'static TypeInfo, list: &'static ListInfo) -> Self {
        Self { info, list }
    }

    fn push(&self, list: &mut dyn Reflect, item: Box<dyn Reflect>, reader: &dyn DataReader) -> SerialResult<()> {
        match self.list.push(list, item) {
            Ok(()) => Ok(()),
            Err(item) => reader.debug().log_error(format_args!(
                "a `{}` cannot be added to a `{}`",
                item.reflect_type_path(),
                self.info.type_path()
            )),
        }
    }

    fn read_items(&self, list: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        reader.enter_array()?;
        let item_info = self.list.item();
        let dispatcher = reader.context().dispatcher(item_info);
        while !reader.peek_entry()?.kind.is_end_marker() {
            // Unreadable items keep their position as a default value.
            if let Some(item) = dispatcher.read_value(reader)?.or_else(|| item_info.create_value()) {
                self.push(list, item, reader)?;
            }
        }
        reader.exit_array()
    }

    fn read_primitive_items(&self, list: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        let kind = self
            .list
            .item()
            .as_primitive()
            .filter(|kind| kind.stride().is_some());
        let Some(kind) = kind else {
            let entry = reader.peek_entry()?;
            return reader.skip_unexpected("an array", &entry);
        };
        if let Some(array) = reader.read_primitive_array(kind)? {
            for item in array.into_boxed() {
                self.push(list, item, reader)?;
            }
        }
        Ok(())
    }
}

impl Formatter for ListFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        let dispatcher = writer.context().dispatcher(self.list.item());
        writer.begin_array_node(wire_len(self.list.len(value)))?;
        self.list
            .for_each(value, &mut |item| dispatcher.write_value(None, item, writer))?;
        writer.end_array_node()
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        self.list.clear(value);
        let entry = reader.peek_entry()?;
        match entry.kind {
            EntryType::StartOfArray => self.read_items(value, reader),
            EntryType::PrimitiveArray => self.read_primitive_items(value, reader),
            kind if kind.is_end_marker() => Ok(()),
            _ => reader.skip_unexpected("an array", &entry),
        }
    }
}

// -----------------------------------------------------------------------------
// PrimitiveListFormatter

/// `Vec`s of fixed-stride primitives, as one primitive array entry.
///
/// Falls back to the item-by-item form when the stream holds a regular
/// array.
#[derive(Debug)]
pub struct PrimitiveListFormatter {
    access: PrimitiveListAccess,
    items: ListFormatter,
}

impl PrimitiveListFormatter {
    pub fn new(info: &'static TypeInfo, list: &'static ListInfo, access: PrimitiveListAccess) -> Self {
        Self {
            access,
            items: ListFormatter::new(info, list),
        }
    }
}

impl Formatter for PrimitiveListFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.items.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        match (self.access.as_slice)(value) {
            Some(slice) => writer.write_primitive_array(slice),
            None => self.items.write_members(value, writer),
        }
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        if reader.peek_entry()?.kind != EntryType::PrimitiveArray {
            return self.items.read_members(value, reader);
        }
        let Some(array) = reader.read_primitive_array(self.access.kind)? else {
            return Ok(());
        };
        match (self.access.assign)(value, array) {
            Ok(()) => Ok(()),
            Err(array) => reader.debug().log_error(format_args!(
                "a primitive array of {} cannot be stored in a `{}`",
                array.kind(),
                self.items.info.type_path()
            )),
        }
    }
}

// -----------------------------------------------------------------------------
// ArrayFormatter

/// Fixed-size arrays. Extra items in the stream are reported and skipped,
/// missing ones keep their default.
#[derive(Debug)]
pub struct ArrayFormatter {
    info: &'static TypeInfo,
    array: &'static ArrayInfo,
}

impl ArrayFormatter {
    pub fn new(info: &'static TypeInfo, array: &'static ArrayInfo) -> Self {
        Self { info, array }
    }
}

impl Formatter for ArrayFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        let dispatcher = writer.context().dispatcher(self.array.item());
        writer.begin_array_node(wire_len(self.array.len()))?;
        for index in 0..self.array.len() {
            match self.array.get(value, index) {
                Some(item) => dispatcher.write_value(None, item, writer)?,
                None => writer.write_null(None)?,
            }
        }
        writer.end_array_node()
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        let entry = reader.peek_entry()?;
        if entry.kind != EntryType::StartOfArray {
            if entry.kind.is_end_marker() {
                return Ok(());
            }
            return reader.skip_unexpected("an array", &entry);
        }
        reader.enter_array()?;

        let dispatcher = reader.context().dispatcher(self.array.item());
        let mut index = 0;
        while !reader.peek_entry()?.kind.is_end_marker() {
            if index >= self.array.len() {
                reader.skip_entry()?;
            } else if let Some(item) = dispatcher.read_value(reader)?
                && let Err(item) = self.array.set(value, index, item)
            {
                reader.debug().log_error(format_args!(
                    "a `{}` cannot be stored in a `{}`",
                    item.reflect_type_path(),
                    self.info.type_path()
                ))?;
            }
            index += 1;
        }
        if index > self.array.len() {
            reader.debug().log_warning(format_args!(
                "`{}` holds {} items, {} extra items were skipped",
                self.info.type_path(),
                self.array.len(),
                index - self.array.len()
            ))?;
        }
        reader.exit_array()
    }
}

// -----------------------------------------------------------------------------
// MapFormatter

/// Maps, as an array of unnamed nodes holding a `$k` and a `$v` member.
#[derive(Debug)]
pub struct MapFormatter {
    info: &'static TypeInfo,
    map: &'static MapInfo,
}

impl MapFormatter {
    pub fn new(info: &'static TypeInfo, map: &'static MapInfo) -> Self {
        Self { info, map }
    }

    fn read_entry(&self, map: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        reader.enter_node()?;
        let key_dispatcher = reader.context().dispatcher(self.map.key());
        let value_dispatcher = reader.context().dispatcher(self.map.value());

        let mut key = None;
        let mut value = None;
        read_named_entries(reader, self.info, |name, reader| {
            match name {
                KEY => key = key_dispatcher.read_value(reader)?,
                VALUE => value = value_dispatcher.read_value(reader)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        reader.exit_node()?;

        let Some(key) = key else {
            return reader
                .debug()
                .log_warning(format_args!("a `{}` entry has no key", self.info.type_path()));
        };
        let Some(value) = value.or_else(|| self.map.value().create_value()) else {
            return reader
                .debug()
                .log_warning(format_args!("a `{}` entry has no value", self.info.type_path()));
        };
        match self.map.insert(map, key, value) {
            Ok(()) => Ok(()),
            Err((key, value)) => reader.debug().log_error(format_args!(
                "a `{}` to `{}` entry cannot be stored in a `{}`",
                key.reflect_type_path(),
                value.reflect_type_path(),
                self.info.type_path()
            )),
        }
    }
}

impl Formatter for MapFormatter {
    #[inline]
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn write_members(&self, value: &dyn Reflect, writer: &mut dyn DataWriter) -> SerialResult<()> {
        let key_dispatcher = writer.context().dispatcher(self.map.key());
        let value_dispatcher = writer.context().dispatcher(self.map.value());
        writer.begin_array_node(wire_len(self.map.len(value)))?;
        self.map.for_each(value, &mut |key, value| {
            writer.begin_struct_node(None, None)?;
            key_dispatcher.write_value(Some(KEY), key, writer)?;
            value_dispatcher.write_value(Some(VALUE), value, writer)?;
            writer.end_node()
        })?;
        writer.end_array_node()
    }

    fn read_members(&self, value: &mut dyn Reflect, reader: &mut dyn DataReader) -> SerialResult<()> {
        self.map.clear(value);
        let entry = reader.peek_entry()?;
        if entry.kind != EntryType::StartOfArray {
            if entry.kind.is_end_marker() {
                return Ok(());
            }
            return reader.skip_unexpected("an array", &entry);
        }
        reader.enter_array()?;
        loop {
            let entry = reader.peek_entry()?;
            match entry.kind {
                EntryType::StartOfNode => self.read_entry(value, reader)?,
                kind if kind.is_end_marker() => break,
                _ => reader.skip_unexpected("a map entry", &entry)?,
            }
        }
        reader.exit_array()
    }
}
