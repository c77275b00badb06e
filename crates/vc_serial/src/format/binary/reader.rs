use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use std::io;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{NARROW, WIDE, classify, primitive_of, tag};
use crate::context::DeserializationContext;
use crate::error::SerialResult;
use crate::format::reader::{skip_structure, skip_until_end};
use crate::format::writer::push_frame;
use crate::format::{DataReader, Entry, EntryType, NodeHeader, NodeInfo, NodeStack, PrimitiveArray};
use crate::hash::HashMap;
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::{Decimal, Guid};

macro_rules! get_numbers {
    ($($name:ident($ty:ty, $len:literal, $read:ident);)*) => {$(
        fn $name(&mut self) -> SerialResult<Option<$ty>> {
            let big_endian = self.big_endian;
            let Some(bytes) = self.take($len) else {
                return self.truncated().map(|()| None);
            };
            Ok(Some(if big_endian {
                BigEndian::$read(bytes)
            } else {
                LittleEndian::$read(bytes)
            }))
        }
    )*};
}

#[derive(Debug, Clone)]
struct Peeked {
    tag: u8,
    entry: Entry,
}

/// Reads the binary form from a byte slice.
///
/// A borrowed slice is decoded in place; [`BinaryDataReader::from_reader`]
/// pulls a whole [`io::Read`] source in one call first.
pub struct BinaryDataReader<'a> {
    data: Cow<'a, [u8]>,
    pos: usize,
    context: &'a mut DeserializationContext,
    nodes: NodeStack,
    // session-local type table: id -> (bound type, written name)
    types: HashMap<i32, (Option<&'static TypeInfo>, String)>,
    peeked: Option<Peeked>,
    big_endian: bool,
}

impl<'a> BinaryDataReader<'a> {
    pub fn new(data: impl Into<Cow<'a, [u8]>>, context: &'a mut DeserializationContext) -> Self {
        let config = context.config();
        let nodes = NodeStack::new(config.max_depth);
        let big_endian = config.byte_order.is_big_endian();
        Self {
            data: data.into(),
            pos: 0,
            context,
            nodes,
            types: HashMap::default(),
            peeked: None,
            big_endian,
        }
    }

    /// Reads everything `source` has left, then decodes from memory.
    pub fn from_reader(
        mut source: impl io::Read,
        context: &'a mut DeserializationContext,
    ) -> io::Result<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Ok(Self::new(data, context))
    }

    /// Byte offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Reports a truncated stream and moves to its end.
    fn truncated(&mut self) -> SerialResult<()> {
        self.pos = self.data.len();
        self.peeked = None;
        self.context
            .debug()
            .log_error("the binary stream ends in the middle of an entry")
    }

    fn get_u8(&mut self) -> SerialResult<Option<u8>> {
        match self.take(1) {
            Some(bytes) => Ok(Some(bytes[0])),
            None => self.truncated().map(|()| None),
        }
    }

    get_numbers! {
        get_i16(i16, 2, read_i16);
        get_u16(u16, 2, read_u16);
        get_i32(i32, 4, read_i32);
        get_u32(u32, 4, read_u32);
        get_i64(i64, 8, read_i64);
        get_u64(u64, 8, read_u64);
        get_f32(f32, 4, read_f32);
        get_f64(f64, 8, read_f64);
    }

    fn get_guid(&mut self) -> SerialResult<Option<Guid>> {
        match self.take(16) {
            Some(bytes) => Ok(Guid::from_slice(bytes).ok()),
            None => self.truncated().map(|()| None),
        }
    }

    fn get_decimal(&mut self) -> SerialResult<Option<Decimal>> {
        let mut bits = [0u32; 4];
        for word in &mut bits {
            let Some(value) = self.get_u32()? else {
                return Ok(None);
            };
            *word = value;
        }
        Ok(Some(Decimal::from_bits(bits)))
    }

    /// Reads a length field; a negative length is reported as corruption.
    fn get_len(&mut self) -> SerialResult<Option<usize>> {
        let Some(len) = self.get_i32()? else {
            return Ok(None);
        };
        match usize::try_from(len) {
            Ok(len) => Ok(Some(len)),
            Err(_) => {
                self.context
                    .debug()
                    .log_error(format_args!("negative length {len} in the binary stream"))?;
                self.pos = self.data.len();
                Ok(None)
            }
        }
    }

    fn get_str(&mut self) -> SerialResult<Option<String>> {
        let Some(flag) = self.get_u8()? else {
            return Ok(None);
        };
        let Some(len) = self.get_len()? else {
            return Ok(None);
        };
        let big_endian = self.big_endian;
        match flag {
            NARROW => match self.take(len) {
                Some(bytes) => Ok(Some(bytes.iter().map(|b| char::from(*b)).collect())),
                None => self.truncated().map(|()| None),
            },
            WIDE => {
                let size = len.saturating_mul(2);
                let Some(bytes) = self.take(size) else {
                    return self.truncated().map(|()| None);
                };
                let units = bytes.chunks_exact(2).map(|pair| {
                    if big_endian {
                        BigEndian::read_u16(pair)
                    } else {
                        LittleEndian::read_u16(pair)
                    }
                });
                Ok(Some(
                    char::decode_utf16(units)
                        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                        .collect(),
                ))
            }
            other => {
                self.context
                    .debug()
                    .log_error(format_args!("unknown string compactness flag {other}"))?;
                self.pos = self.data.len();
                Ok(None)
            }
        }
    }

    fn skip_str(&mut self) -> SerialResult<()> {
        let Some(flag) = self.get_u8()? else {
            return Ok(());
        };
        let Some(len) = self.get_len()? else {
            return Ok(());
        };
        let size = if flag == WIDE { len.saturating_mul(2) } else { len };
        if self.take(size).is_none() {
            self.truncated()?;
        }
        Ok(())
    }

    /// Takes the peeked entry if its tag satisfies `accept`.
    fn take_peeked(&mut self, accept: impl Fn(u8) -> bool) -> SerialResult<Option<u8>> {
        self.peek_entry()?;
        match &self.peeked {
            Some(peeked) if accept(peeked.tag) => {
                let tag = peeked.tag;
                self.peeked = None;
                Ok(Some(tag))
            }
            _ => Ok(None),
        }
    }

    fn mismatch<T>(&mut self, expected: &str) -> SerialResult<Option<T>> {
        let entry = self.peek_entry()?;
        self.skip_unexpected(expected, &entry)?;
        Ok(None)
    }

    fn read_value(&mut self, tag: u8) -> SerialResult<Option<Value>> {
        let Some(kind) = primitive_of(tag) else {
            return Ok(None);
        };
        Ok(match kind {
            PrimitiveKind::I8 => self.get_u8()?.map(|v| Value::Int(i128::from(v as i8))),
            PrimitiveKind::U8 => self.get_u8()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::I16 => self.get_i16()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::U16 => self.get_u16()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::I32 => self.get_i32()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::U32 => self.get_u32()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::I64 => self.get_i64()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::U64 => self.get_u64()?.map(|v| Value::Int(i128::from(v))),
            PrimitiveKind::F32 => self.get_f32()?.map(|v| Value::Float(f64::from(v))),
            PrimitiveKind::F64 => self.get_f64()?.map(Value::Float),
            PrimitiveKind::Decimal => self.get_decimal()?.map(Value::Decimal),
            PrimitiveKind::Char => self.get_u16()?.map(|unit| {
                Value::Char(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
            }),
            PrimitiveKind::String => self.get_str()?.map(Value::String),
            PrimitiveKind::Guid => self.get_guid()?.map(Value::Guid),
            PrimitiveKind::Bool => self.get_u8()?.map(|v| Value::Bool(v != 0)),
            PrimitiveKind::Isize | PrimitiveKind::Usize => None,
        })
    }

    /// Consumes a value entry of the given entry type.
    fn take_value(&mut self, kinds: &[EntryType], expected: &str) -> SerialResult<Option<Value>> {
        let entry = self.peek_entry()?;
        if !kinds.contains(&entry.kind) {
            return self.mismatch(expected);
        }
        match self.take_peeked(|t| primitive_of(t).is_some())? {
            Some(tag) => self.read_value(tag),
            None => self.mismatch(expected),
        }
    }

    fn read_type_entry(&mut self) -> SerialResult<(Option<&'static TypeInfo>, Option<String>)> {
        let Some(type_tag) = self.get_u8()? else {
            return Ok((None, None));
        };
        match type_tag {
            tag::UNNAMED_NULL => Ok((None, None)),
            tag::TYPE_NAME => {
                let Some(id) = self.get_i32()? else {
                    return Ok((None, None));
                };
                let Some(name) = self.get_str()? else {
                    return Ok((None, None));
                };
                let ty = self.context.bind_to_type(&name);
                self.types.insert(id, (ty, name.clone()));
                Ok((ty, Some(name)))
            }
            tag::TYPE_ID => {
                let Some(id) = self.get_i32()? else {
                    return Ok((None, None));
                };
                match self.types.get(&id) {
                    Some((ty, name)) => Ok((*ty, Some(name.clone()))),
                    None => {
                        self.context
                            .debug()
                            .log_error(format_args!("type id {id} was never declared"))?;
                        Ok((None, Some(alloc::format!("#{id}"))))
                    }
                }
            }
            other => {
                self.context
                    .debug()
                    .log_error(format_args!("invalid type entry tag {other}"))?;
                self.pos = self.data.len();
                Ok((None, None))
            }
        }
    }
}

/// A decoded value entry.
enum Value {
    Bool(bool),
    Int(i128),
    Float(f64),
    Decimal(Decimal),
    Char(char),
    String(String),
    Guid(Guid),
}

impl DataReader for BinaryDataReader<'_> {
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
        if let Some(peeked) = &self.peeked {
            return Ok(peeked.entry.clone());
        }
        let Some(&tag) = self.data.get(self.pos) else {
            return Ok(Entry::unnamed(EntryType::EndOfStream));
        };
        self.pos += 1;
        let (kind, named) = classify(tag);
        let name = if named { self.get_str()? } else { None };
        if named && name.is_none() {
            // The name itself was corrupt; nothing after it can be trusted.
            return Ok(Entry::unnamed(EntryType::EndOfStream));
        }
        let entry = Entry::named(kind, name);
        self.peeked = Some(Peeked {
            tag,
            entry: entry.clone(),
        });
        Ok(entry)
    }

    fn peek_primitive_kind(&mut self) -> SerialResult<Option<PrimitiveKind>> {
        self.peek_entry()?;
        Ok(self.peeked.as_ref().and_then(|p| primitive_of(p.tag)))
    }

    fn enter_node(&mut self) -> SerialResult<Option<NodeHeader>> {
        let entry = self.peek_entry()?;
        let Some(node_tag) = self.take_peeked(|t| (1..=4).contains(&t))? else {
            return Ok(None);
        };
        let (ty, type_name) = self.read_type_entry()?;
        let id = if node_tag <= 2 {
            self.get_i32()?.unwrap_or(-1)
        } else {
            -1
        };
        push_frame(
            &mut self.nodes,
            NodeInfo::node(entry.name.as_deref(), id, ty),
            self.context.debug(),
        )?;
        Ok(Some(NodeHeader { id, ty, type_name }))
    }

    fn exit_node(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfNode)? {
            self.peeked = None;
        }
        self.nodes.pop();
        Ok(())
    }

    fn enter_array(&mut self) -> SerialResult<Option<i64>> {
        if self.take_peeked(|t| t == tag::START_OF_ARRAY)?.is_none() {
            return Ok(None);
        }
        let Some(len) = self.get_i64()? else {
            return Ok(None);
        };
        push_frame(&mut self.nodes, NodeInfo::array(), self.context.debug())?;
        if len < 0 {
            self.context
                .debug()
                .log_error(format_args!("negative array length {len}"))?;
            return Ok(Some(0));
        }
        Ok(Some(len))
    }

    fn exit_array(&mut self) -> SerialResult<()> {
        if skip_until_end(self, EntryType::EndOfArray)? {
            self.peeked = None;
        }
        self.nodes.pop();
        Ok(())
    }

    fn read_primitive_array(&mut self, kind: PrimitiveKind) -> SerialResult<Option<PrimitiveArray>> {
        if self.take_peeked(|t| t == tag::PRIMITIVE_ARRAY)?.is_none() {
            return self.mismatch("a primitive array");
        }
        let Some(count) = self.get_len()? else {
            return Ok(None);
        };
        let Some(stride) = self.get_len()? else {
            return Ok(None);
        };
        let big_endian = self.big_endian;
        let size = count.saturating_mul(stride);
        let Some(bytes) = self.take(size) else {
            return self.truncated().map(|()| None);
        };
        if kind.stride() != Some(stride) {
            self.context.debug().log_error(format_args!(
                "primitive array of stride {stride} cannot hold {kind} elements"
            ))?;
            return Ok(None);
        }
        Ok(PrimitiveArray::decode(kind, count, bytes, big_endian))
    }

    fn skip_entry(&mut self) -> SerialResult<()> {
        let entry = self.peek_entry()?;
        if entry.kind.is_end_marker() || skip_structure(self, entry.kind)? {
            return Ok(());
        }
        let Some(Peeked { tag: entry_tag, .. }) = self.peeked.take() else {
            return Ok(());
        };
        let size = match entry_tag {
            tag::PRIMITIVE_ARRAY => {
                let (Some(count), Some(stride)) = (self.get_len()?, self.get_len()?) else {
                    return Ok(());
                };
                count.saturating_mul(stride)
            }
            9..=12 => 4,
            13 | 14 => 16,
            45 | 46 => 0,
            39 | 40 | 50 | 51 => return self.skip_str(),
            _ => match primitive_of(entry_tag).and_then(PrimitiveKind::stride) {
                Some(stride) => stride,
                None => match primitive_of(entry_tag) {
                    Some(PrimitiveKind::Decimal | PrimitiveKind::Guid) => 16,
                    _ => {
                        self.pos = self.data.len();
                        return self.context.debug().log_error(format_args!(
                            "invalid entry tag {entry_tag}, the rest of the binary stream is unreadable"
                        ));
                    }
                },
            },
        };
        if self.take(size).is_none() {
            self.truncated()?;
        }
        Ok(())
    }

    fn prepare_new_session(&mut self) {
        let config = self.context.config();
        self.big_endian = config.byte_order.is_big_endian();
        self.nodes.set_max_depth(config.max_depth);
        self.nodes.clear();
        self.types.clear();
        self.peeked = None;
    }

    fn read_internal_reference(&mut self) -> SerialResult<Option<i32>> {
        match self.take_peeked(|t| t == 9 || t == 10)? {
            Some(_) => self.get_i32(),
            None => self.mismatch("an internal reference"),
        }
    }

    fn read_external_reference_index(&mut self) -> SerialResult<Option<i32>> {
        match self.take_peeked(|t| t == 11 || t == 12)? {
            Some(_) => self.get_i32(),
            None => self.mismatch("an external index reference"),
        }
    }

    fn read_external_reference_guid(&mut self) -> SerialResult<Option<Guid>> {
        match self.take_peeked(|t| t == 13 || t == 14)? {
            Some(_) => self.get_guid(),
            None => self.mismatch("an external guid reference"),
        }
    }

    fn read_external_reference_string(&mut self) -> SerialResult<Option<String>> {
        match self.take_peeked(|t| t == 50 || t == 51)? {
            Some(_) => self.get_str(),
            None => self.mismatch("an external string reference"),
        }
    }

    fn read_null(&mut self) -> SerialResult<bool> {
        Ok(self.take_peeked(|t| t == 45 || t == 46)?.is_some())
    }

    fn read_bool(&mut self) -> SerialResult<Option<bool>> {
        Ok(match self.take_value(&[EntryType::Boolean], "a boolean")? {
            Some(Value::Bool(v)) => Some(v),
            _ => None,
        })
    }

    fn read_integer(&mut self) -> SerialResult<Option<i128>> {
        Ok(match self.take_value(&[EntryType::Integer], "an integer")? {
            Some(Value::Int(v)) => Some(v),
            _ => None,
        })
    }

    fn read_float(&mut self) -> SerialResult<Option<f64>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        Ok(match self.take_value(&kinds, "a floating point number")? {
            Some(Value::Float(v)) => Some(v),
            Some(Value::Int(v)) => Some(v as f64),
            Some(Value::Decimal(v)) => Some(v.to_f64()),
            _ => None,
        })
    }

    fn read_decimal(&mut self) -> SerialResult<Option<Decimal>> {
        let kinds = [EntryType::FloatingPoint, EntryType::Integer];
        match self.take_value(&kinds, "a decimal")? {
            Some(Value::Decimal(v)) => Ok(Some(v)),
            Some(Value::Int(v)) => Ok(Decimal::new(v, 0)),
            Some(Value::Float(v)) => match Decimal::from_f64(v) {
                Some(v) => Ok(Some(v)),
                None => {
                    self.context
                        .debug()
                        .log_warning(format_args!("{v} cannot be stored as a decimal"))?;
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn read_char(&mut self) -> SerialResult<Option<char>> {
        match self.take_value(&[EntryType::String], "a char")? {
            Some(Value::Char(c)) => Ok(Some(c)),
            Some(Value::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Some(c)),
                    _ => {
                        self.context
                            .debug()
                            .log_warning(format_args!("string {s:?} is not a single char"))?;
                        Ok(None)
                    }
                }
            }
            _ => Ok(None),
        }
    }

    fn read_string(&mut self) -> SerialResult<Option<String>> {
        Ok(match self.take_value(&[EntryType::String], "a string")? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Char(c)) => Some(String::from(c)),
            _ => None,
        })
    }

    fn read_guid(&mut self) -> SerialResult<Option<Guid>> {
        Ok(match self.take_value(&[EntryType::Guid], "a guid")? {
            Some(Value::Guid(g)) => Some(g),
            _ => None,
        })
    }
}
