//! In-memory node list form.
//!
//! Every entry becomes one [`SerializationNode`] with its payload as text,
//! so two serialized graphs can be compared or patched entry by entry.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::{DeserializationContext, SerializationContext};
use crate::error::SerialResult;
use crate::format::primitive_array::{float_from_text, float_to_text};
use crate::format::reader::{skip_structure, skip_until_end};
use crate::format::writer::push_frame;
use crate::format::{
    DataReader, DataWriter, Entry, EntryType, NodeHeader, NodeInfo, NodeStack, PrimitiveArray,
    PrimitiveSlice,
};
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::{Decimal, Guid};

/// One entry of the node list form.
///
/// `data` holds `id|type` for reference nodes, the type for struct nodes,
/// the length for arrays, `count|v1,v2,..` for primitive arrays and the
/// text of the value otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationNode {
    pub name: String,
    pub entry: EntryType,
    pub data: String,
}

impl SerializationNode {
    fn new(name: Option<&str>, entry: EntryType, data: impl Into<String>) -> Self {
        Self {
            name: name.map(String::from).unwrap_or_default(),
            entry,
            data: data.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// Writer

/// Appends entries to a `Vec<SerializationNode>`.
pub struct SerializationNodeDataWriter<'a> {
    output: Vec<SerializationNode>,
    context: &'a mut SerializationContext,
    nodes: NodeStack,
}

impl<'a> SerializationNodeDataWriter<'a> {
    pub fn new(context: &'a mut SerializationContext) -> Self {
        let nodes = NodeStack::new(context.config().max_depth);
        Self {
            output: Vec::new(),
            context,
            nodes,
        }
    }

    /// Entries written so far.
    #[inline]
    pub fn written(&self) -> &[SerializationNode] {
        &self.output
    }

    pub fn into_inner(self) -> Vec<SerializationNode> {
        self.output
    }

    fn push_entry(&mut self, name: Option<&str>, entry: EntryType, data: impl Into<String>) -> SerialResult<()> {
        self.output.push(SerializationNode::new(name, entry, data));
        Ok(())
    }

    fn type_name(&self, ty: Option<&'static TypeInfo>) -> &'static str {
        ty.map_or("", |info| self.context.bind_to_name(info))
    }
}

impl DataWriter for SerializationNodeDataWriter<'_> {
    #[inline]
    fn context(&self) -> &SerializationContext {
        self.context
    }

    #[inline]
    fn context_mut(&mut self) -> &mut SerializationContext {
        self.context
    }

    #[inline]
    fn nodes(&self) -> &NodeStack {
        &self.nodes
    }

    fn begin_reference_node(
        &mut self,
        name: Option<&str>,
        ty: Option<&'static TypeInfo>,
        id: i32,
    ) -> SerialResult<()> {
        let data = alloc::format!("{id}|{}", self.type_name(ty));
        push_frame(&mut self.nodes, NodeInfo::node(name, id, ty), self.context.debug())?;
        self.push_entry(name, EntryType::StartOfNode, data)
    }

    fn begin_struct_node(&mut self, name: Option<&str>, ty: Option<&'static TypeInfo>) -> SerialResult<()> {
        let data = self.type_name(ty);
        push_frame(&mut self.nodes, NodeInfo::node(name, -1, ty), self.context.debug())?;
        self.push_entry(name, EntryType::StartOfNode, data)
    }

    fn end_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.push_entry(None, EntryType::EndOfNode, "")
    }

    fn begin_array_node(&mut self, len: i64) -> SerialResult<()> {
        push_frame(&mut self.nodes, NodeInfo::array(), self.context.debug())?;
        self.push_entry(None, EntryType::StartOfArray, len.to_string())
    }

    fn end_array_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.push_entry(None, EntryType::EndOfArray, "")
    }

    fn write_primitive_array(&mut self, array: PrimitiveSlice<'_>) -> SerialResult<()> {
        let mut data = alloc::format!("{}|", array.len());
        array.write_text(",", &mut data);
        self.push_entry(None, EntryType::PrimitiveArray, data)
    }

    fn flush(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn prepare_new_session(&mut self) {
        self.nodes.set_max_depth(self.context.config().max_depth);
        self.nodes.clear();
    }

    fn write_null(&mut self, name: Option<&str>) -> SerialResult<()> {
        self.push_entry(name, EntryType::Null, "")
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) -> SerialResult<()> {
        self.push_entry(name, EntryType::InternalReference, id.to_string())
    }

    fn write_external_reference_index(&mut self, name: Option<&str>, index: i32) -> SerialResult<()> {
        self.push_entry(name, EntryType::ExternalReferenceByIndex, index.to_string())
    }

    fn write_external_reference_guid(&mut self, name: Option<&str>, guid: Guid) -> SerialResult<()> {
        self.push_entry(name, EntryType::ExternalReferenceByGuid, guid.to_string())
    }

    fn write_external_reference_string(&mut self, name: Option<&str>, key: &str) -> SerialResult<()> {
        self.push_entry(name, EntryType::ExternalReferenceByString, key)
    }

    fn write_bool(&mut self, name: Option<&str>, value: bool) -> SerialResult<()> {
        self.push_entry(name, EntryType::Boolean, value.to_string())
    }

    fn write_i8(&mut self, name: Option<&str>, value: i8) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_u8(&mut self, name: Option<&str>, value: u8) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_i16(&mut self, name: Option<&str>, value: i16) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_u16(&mut self, name: Option<&str>, value: u16) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_i32(&mut self, name: Option<&str>, value: i32) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_u32(&mut self, name: Option<&str>, value: u32) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_i64(&mut self, name: Option<&str>, value: i64) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_u64(&mut self, name: Option<&str>, value: u64) -> SerialResult<()> {
        self.push_entry(name, EntryType::Integer, value.to_string())
    }

    fn write_f32(&mut self, name: Option<&str>, value: f32) -> SerialResult<()> {
        self.push_entry(name, EntryType::FloatingPoint, float_to_text(f64::from(value), true))
    }

    fn write_f64(&mut self, name: Option<&str>, value: f64) -> SerialResult<()> {
        self.push_entry(name, EntryType::FloatingPoint, float_to_text(value, false))
    }

    fn write_decimal(&mut self, name: Option<&str>, value: Decimal) -> SerialResult<()> {
        self.push_entry(name, EntryType::FloatingPoint, value.to_string())
    }

    fn write_char(&mut self, name: Option<&str>, value: char) -> SerialResult<()> {
        self.push_entry(name, EntryType::String, value.to_string())
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) -> SerialResult<()> {
        self.push_entry(name, EntryType::String, value)
    }

    fn write_guid(&mut self, name: Option<&str>, value: Guid) -> SerialResult<()> {
        self.push_entry(name, EntryType::Guid, value.to_string())
    }
}

// -----------------------------------------------------------------------------
// Reader

/// Reads entries back from a node list.
pub struct SerializationNodeDataReader<'a> {
    list: Cow<'a, [SerializationNode]>,
    index: usize,
    context: &'a mut DeserializationContext,
    nodes: NodeStack,
}

impl<'a> SerializationNodeDataReader<'a> {
    pub fn new(
        list: impl Into<Cow<'a, [SerializationNode]>>,
        context: &'a mut DeserializationContext,
    ) -> Self {
        let nodes = NodeStack::new(context.config().max_depth);
        Self {
            list: list.into(),
            index: 0,
            context,
            nodes,
        }
    }

    /// Index of the next unread entry.
    #[inline]
    pub fn position(&self) -> usize {
        self.index
    }

    fn current(&self) -> Option<&SerializationNode> {
        self.list.get(self.index)
    }

    /// Consumes the next entry and returns its data if its type is one of
    /// `kinds`; otherwise reports and skips it.
    fn take_data(&mut self, kinds: &[EntryType], expected: &str) -> SerialResult<Option<String>> {
        let entry = self.peek_entry()?;
        if !kinds.contains(&entry.kind) {
            self.skip_unexpected(expected, &entry)?;
            return Ok(None);
        }
        let data = self.current().map(|node| node.data.clone());
        self.index += 1;
        Ok(data)
    }

    fn parse<T: FromStr>(&mut self, kinds: &[EntryType], expected: &str) -> SerialResult<Option<T>> {
        let Some(data) = self.take_data(kinds, expected)? else {
            return Ok(None);
        };
        match data.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                self.context
                    .debug()
                    .log_error(format_args!("`{data}` is not {expected}"))?;
                Ok(None)
            }
        }
    }
}

/// Splits node data into id and type name, `-1` for struct nodes.
fn split_node_data(data: &str) -> (i32, &str) {
    if let Some((id, ty)) = data.split_once('|')
        && let Ok(id) = id.parse()
    {
        return (id, ty);
    }
    (-1, data)
}

impl DataReader for SerializationNodeDataReader<'_> {
    #[inline]
    fn context(&self) -> &DeserializationContext {
        self.context
    }

    #[inline]
    fn context_mut(&mut self) -> &mut DeserializationContext {
        self.context
    }

    #[inline]
    fn nodes(&self) -> &NodeStack {
        &self.nodes
    }

    fn peek_entry(&mut self) -> SerialResult<Entry> {
        Ok(match self.current() {
            Some(node) => {
                let name = (!node.name.is_empty()).then(|| node.name.clone());
                Entry::named(node.entry, name)
            }
            None => Entry::unnamed(EntryType::EndOfStream),
        })
    }

    fn enter_node(&mut self) -> SerialResult<Option<NodeHeader>> {
        let Some(node) = self.current().filter(|n| n.entry == EntryType::StartOfNode) else {
            return Ok(None);
        };
        let name = (!node.name.is_empty()).then(|| node.name.clone());
        let (id, type_name) = split_node_data(&node.data);
        let type_name = (!type_name.is_empty()).then(|| String::from(type_name));
        self.index += 1;

        let ty = match &type_name {
            Some(type_name) => self.context.bind_to_type(type_name),
            None => None,
        };
        push_frame(
            &mut self.nodes,
            NodeInfo::node(name.as_deref(), id, ty),
            self.context.debug(),
        )?;
        Ok(Some(NodeHeader { id, ty, type_name }))
    }

    fn exit_node(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfNode)? {
            self.index += 1;
        }
        self.nodes.pop();
        Ok(())
    }

    fn enter_array(&mut self) -> SerialResult<Option<i64>> {
        let Some(node) = self.current().filter(|n| n.entry == EntryType::StartOfArray) else {
            return Ok(None);
        };
        let len = node.data.parse::<i64>();
        self.index += 1;
        push_frame(&mut self.nodes, NodeInfo::array(), self.context.debug())?;
        match len {
            Ok(len) if len >= 0 => Ok(Some(len)),
            _ => {
                self.context
                    .debug()
                    .log_error("array node without a valid length")?;
                Ok(Some(0))
            }
        }
    }

    fn exit_array(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfArray)? {
            self.index += 1;
        }
        self.nodes.pop();
        Ok(())
    }

    fn read_primitive_array(&mut self, kind: PrimitiveKind) -> SerialResult<Option<PrimitiveArray>> {
        let Some(data) = self.take_data(&[EntryType::PrimitiveArray], "a primitive array")? else {
            return Ok(None);
        };
        let (count, items) = data.split_once('|').unwrap_or(("", &data));
        let items: Vec<&str> = if items.is_empty() {
            Vec::new()
        } else {
            items.split(',').collect()
        };
        if count.parse::<usize>().ok() != Some(items.len()) {
            self.context.debug().log_warning(format_args!(
                "primitive array declares `{count}` elements but holds {}",
                items.len()
            ))?;
        }
        let array = PrimitiveArray::from_text(kind, items);
        if array.is_none() {
            self.context
                .debug()
                .log_error(format_args!("primitive array elements are not all {kind}"))?;
        }
        Ok(array)
    }

    fn skip_entry(&mut self) -> SerialResult<()> {
        let entry = self.peek_entry()?;
        if entry.kind.is_end_marker() || skip_structure(self, entry.kind)? {
            return Ok(());
        }
        self.index += 1;
        Ok(())
    }

    fn prepare_new_session(&mut self) {
        self.nodes.set_max_depth(self.context.config().max_depth);
        self.nodes.clear();
    }

    fn read_internal_reference(&mut self) -> SerialResult<Option<i32>> {
        self.parse(&[EntryType::InternalReference], "an internal reference")
    }

    fn read_external_reference_index(&mut self) -> SerialResult<Option<i32>> {
        self.parse(&[EntryType::ExternalReferenceByIndex], "an external index reference")
    }

    fn read_external_reference_guid(&mut self) -> SerialResult<Option<Guid>> {
        self.parse(&[EntryType::ExternalReferenceByGuid], "an external guid reference")
    }

    fn read_external_reference_string(&mut self) -> SerialResult<Option<String>> {
        self.take_data(&[EntryType::ExternalReferenceByString], "an external string reference")
    }

    fn read_null(&mut self) -> SerialResult<bool> {
        if self.peek_entry()?.kind != EntryType::Null {
            return Ok(false);
        }
        self.index += 1;
        Ok(true)
    }

    fn read_bool(&mut self) -> SerialResult<Option<bool>> {
        self.parse(&[EntryType::Boolean], "a boolean")
    }

    fn read_integer(&mut self) -> SerialResult<Option<i128>> {
        self.parse(&[EntryType::Integer], "an integer")
    }

    fn read_float(&mut self) -> SerialResult<Option<f64>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        let Some(data) = self.take_data(&kinds, "a floating point number")? else {
            return Ok(None);
        };
        match float_from_text(&data) {
            Some(value) => Ok(Some(value)),
            None => {
                self.context
                    .debug()
                    .log_error(format_args!("`{data}` is not a floating point number"))?;
                Ok(None)
            }
        }
    }

    fn read_decimal(&mut self) -> SerialResult<Option<Decimal>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        let Some(data) = self.take_data(&kinds, "a decimal")? else {
            return Ok(None);
        };
        match data
            .parse::<Decimal>()
            .ok()
            .or_else(|| float_from_text(&data).and_then(Decimal::from_f64))
        {
            Some(value) => Ok(Some(value)),
            None => {
                self.context
                    .debug()
                    .log_warning(format_args!("`{data}` cannot be stored as a decimal"))?;
                Ok(None)
            }
        }
    }

    fn read_char(&mut self) -> SerialResult<Option<char>> {
        let Some(data) = self.take_data(&[EntryType::String], "a char")? else {
            return Ok(None);
        };
        let mut chars = data.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Some(c)),
            _ => {
                self.context
                    .debug()
                    .log_warning(format_args!("string {data:?} is not a single char"))?;
                Ok(None)
            }
        }
    }

    fn read_string(&mut self) -> SerialResult<Option<String>> {
        self.take_data(&[EntryType::String], "a string")
    }

    fn read_guid(&mut self) -> SerialResult<Option<Guid>> {
        self.parse(&[EntryType::Guid], "a guid")
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;

    use super::*;
    use crate::config::SerializationConfig;
    use crate::info::Typed;
    use crate::registry::Registry;

    #[test]
    fn entries_are_textual() {
        let registry = Arc::new(Registry::new());
        let mut context = SerializationContext::new(registry.clone(), SerializationConfig::default()).unwrap();
        let mut writer = SerializationNodeDataWriter::new(&mut context);
        writer.begin_reference_node(None, Some(<Vec<u16>>::type_info()), 0).unwrap();
        writer.write_primitive_array(PrimitiveSlice::U16(&[7, 8])).unwrap();
        writer.write_f32(Some("f"), 0.5).unwrap();
        writer.end_node().unwrap();
        let list = writer.into_inner();

        assert_eq!(
            list,
            [
                SerializationNode::new(None, EntryType::StartOfNode, "0|alloc::vec::Vec<u16>"),
                SerializationNode::new(None, EntryType::PrimitiveArray, "2|7,8"),
                SerializationNode::new(Some("f"), EntryType::FloatingPoint, "0.5"),
                SerializationNode::new(None, EntryType::EndOfNode, ""),
            ]
        );

        registry.register::<Vec<u16>>();
        let mut context = DeserializationContext::new(registry, SerializationConfig::default()).unwrap();
        let mut reader = SerializationNodeDataReader::new(&list[..], &mut context);
        let header = reader.enter_node().unwrap().unwrap();
        assert_eq!(header.id, 0);
        assert_eq!(header.ty.map(|t| t.type_path()), Some("alloc::vec::Vec<u16>"));
        assert_eq!(
            reader.read_primitive_array(PrimitiveKind::U16).unwrap(),
            Some(PrimitiveArray::U16(vec![7, 8]))
        );
        assert_eq!(reader.read_f32().unwrap(), Some(0.5));
        reader.exit_node().unwrap();
        assert_eq!(reader.peek_entry().unwrap().kind, EntryType::EndOfStream);
    }

    #[test]
    fn skipping_every_kind_ends_where_reading_does() {
        let registry = Arc::new(Registry::new());
        registry.register::<Vec<u8>>();
        let mut context = SerializationContext::new(registry.clone(), SerializationConfig::default()).unwrap();
        let mut writer = SerializationNodeDataWriter::new(&mut context);
        crate::format::every_kind::write(&mut writer);
        let list = writer.into_inner();

        let mut context = DeserializationContext::new(registry, SerializationConfig::default()).unwrap();
        let logger = Arc::new(crate::debug::MemoryLogger::new());
        context.set_logger(logger.clone());
        let mut reader = SerializationNodeDataReader::new(&list[..], &mut context);
        crate::format::every_kind::read(&mut reader);
        let read_to = reader.position();
        assert_eq!(read_to, list.len());

        let mut reader = SerializationNodeDataReader::new(&list[..], &mut context);
        crate::format::every_kind::skip(&mut reader);
        assert_eq!(reader.position(), read_to);
        assert!(logger.entries().is_empty(), "{:?}", logger.entries());
    }

    #[test]
    fn struct_nodes_without_type() {
        assert_eq!(split_node_data(""), (-1, ""));
        assert_eq!(split_node_data("3|"), (3, ""));
        assert_eq!(split_node_data("my::Type"), (-1, "my::Type"));
    }

    #[test]
    fn node_lists_are_serde_values() {
        let node = SerializationNode::new(Some("x"), EntryType::Integer, "5");
        let text = serde_json::to_string(&node).unwrap();
        let back: SerializationNode = serde_json::from_str(&text).unwrap();
        assert_eq!(back, node);
    }
}
