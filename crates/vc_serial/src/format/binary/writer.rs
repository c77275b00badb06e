use alloc::vec::Vec;
use core::any::TypeId;
use std::io;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{NARROW, WIDE, tag};
use crate::context::SerializationContext;
use crate::error::SerialResult;
use crate::format::writer::push_frame;
use crate::format::{DataWriter, NodeInfo, NodeStack, PrimitiveSlice};
use crate::hash::HashMap;
use crate::info::TypeInfo;
use crate::reflect::{Decimal, Guid};
use crate::registry::{BufferPool, PooledBuffer};

macro_rules! put_numbers {
    ($($name:ident($ty:ty, $len:literal, $write:ident);)*) => {$(
        #[inline]
        fn $name(&mut self, value: $ty) -> SerialResult<()> {
            let mut bytes = [0u8; $len];
            if self.big_endian {
                BigEndian::$write(&mut bytes, value);
            } else {
                LittleEndian::$write(&mut bytes, value);
            }
            self.put(&bytes)
        }
    )*};
}

macro_rules! write_values {
    ($($name:ident($ty:ty) => $tag:expr, $put:ident;)*) => {$(
        fn $name(&mut self, name: Option<&str>, value: $ty) -> SerialResult<()> {
            self.put_tag($tag, name)?;
            self.$put(value)
        }
    )*};
}

/// Writes the binary form into any [`io::Write`].
///
/// Output goes through a pooled scratch buffer that is flushed to the sink
/// whenever it fills up, and by [`DataWriter::flush`].
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::config::SerializationConfig;
/// use vc_serial::context::SerializationContext;
/// use vc_serial::format::{BinaryDataWriter, DataWriter};
/// use vc_serial::registry::Registry;
///
/// let mut context = SerializationContext::new(Arc::new(Registry::new()), SerializationConfig::default()).unwrap();
/// let mut writer = BinaryDataWriter::new(Vec::new(), &mut context);
/// writer.write_i32(None, 12345).unwrap();
/// writer.flush().unwrap();
/// assert_eq!(writer.into_inner(), [24, 0x39, 0x30, 0, 0]);
/// ```
pub struct BinaryDataWriter<'a, W: io::Write> {
    output: W,
    context: &'a mut SerializationContext,
    buffer: PooledBuffer,
    nodes: NodeStack,
    // session-local type table
    types: HashMap<TypeId, i32>,
    big_endian: bool,
    narrow_strings: bool,
}

impl<'a, W: io::Write> BinaryDataWriter<'a, W> {
    pub fn new(output: W, context: &'a mut SerializationContext) -> Self {
        let config = context.config();
        let nodes = NodeStack::new(config.max_depth);
        let big_endian = config.byte_order.is_big_endian();
        let narrow_strings = config.narrow_strings;
        let buffer = context.registry().buffers().acquire();
        Self {
            output,
            context,
            buffer,
            nodes,
            types: HashMap::default(),
            big_endian,
            narrow_strings,
        }
    }

    /// Returns the sink. Call [`DataWriter::flush`] first.
    pub fn into_inner(self) -> W {
        self.output
    }

    fn flush_buffer(&mut self) -> SerialResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = self.output.write_all(&self.buffer);
        self.buffer.clear();
        result.map_err(|err| self.context.debug().abort(alloc::format!("i/o failure: {err}")))
    }

    fn put(&mut self, bytes: &[u8]) -> SerialResult<()> {
        if self.buffer.len() + bytes.len() > BufferPool::BUFFER_SIZE {
            self.flush_buffer()?;
            if bytes.len() > BufferPool::BUFFER_SIZE {
                return self
                    .output
                    .write_all(bytes)
                    .map_err(|err| self.context.debug().abort(alloc::format!("i/o failure: {err}")));
            }
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn put_u8(&mut self, value: u8) -> SerialResult<()> {
        self.put(&[value])
    }

    #[inline]
    fn put_i8(&mut self, value: i8) -> SerialResult<()> {
        self.put(&[value as u8])
    }

    #[inline]
    fn put_bool(&mut self, value: bool) -> SerialResult<()> {
        self.put(&[u8::from(value)])
    }

    put_numbers! {
        put_i16(i16, 2, write_i16);
        put_u16(u16, 2, write_u16);
        put_i32(i32, 4, write_i32);
        put_u32(u32, 4, write_u32);
        put_i64(i64, 8, write_i64);
        put_u64(u64, 8, write_u64);
        put_f32(f32, 4, write_f32);
        put_f64(f64, 8, write_f64);
    }

    fn put_decimal(&mut self, value: Decimal) -> SerialResult<()> {
        for word in value.to_bits() {
            self.put_u32(word)?;
        }
        Ok(())
    }

    #[inline]
    fn put_guid(&mut self, value: Guid) -> SerialResult<()> {
        self.put(value.as_bytes())
    }

    fn put_char(&mut self, value: char) -> SerialResult<()> {
        let mut units = [0u16; 2];
        let encoded = value.encode_utf16(&mut units);
        if encoded.len() > 1 {
            // A char slot holds one UTF-16 unit.
            self.context.debug().log_warning(format_args!(
                "char {value:?} needs a surrogate pair and is written as U+FFFD"
            ))?;
            return self.put_u16(0xFFFD);
        }
        self.put_u16(encoded[0])
    }

    fn put_len(&mut self, len: usize) -> SerialResult<()> {
        match i32::try_from(len) {
            Ok(len) => self.put_i32(len),
            Err(_) => Err(self
                .context
                .debug()
                .abort(alloc::format!("length {len} does not fit the binary form"))),
        }
    }

    fn put_str(&mut self, value: &str) -> SerialResult<()> {
        if self.narrow_strings && value.chars().all(|c| u32::from(c) <= 0xFF) {
            self.put_u8(NARROW)?;
            self.put_len(value.chars().count())?;
            for c in value.chars() {
                self.put_u8(u32::from(c) as u8)?;
            }
        } else {
            self.put_u8(WIDE)?;
            self.put_len(value.encode_utf16().count())?;
            for unit in value.encode_utf16() {
                self.put_u16(unit)?;
            }
        }
        Ok(())
    }

    /// Writes the tag, picking the unnamed variant when `name` is `None`.
    fn put_tag(&mut self, named: u8, name: Option<&str>) -> SerialResult<()> {
        match name {
            Some(name) => {
                self.put_u8(named)?;
                self.put_str(name)
            }
            None => self.put_u8(named + 1),
        }
    }

    fn put_type(&mut self, ty: Option<&'static TypeInfo>) -> SerialResult<()> {
        let Some(info) = ty else {
            return self.put_u8(tag::UNNAMED_NULL);
        };
        if let Some(id) = self.types.get(&info.type_id()).copied() {
            self.put_u8(tag::TYPE_ID)?;
            return self.put_i32(id);
        }
        let id = self.types.len() as i32;
        self.types.insert(info.type_id(), id);
        let name = self.context.bind_to_name(info);
        self.put_u8(tag::TYPE_NAME)?;
        self.put_i32(id)?;
        self.put_str(name)
    }

    fn push(&mut self, node: NodeInfo) -> SerialResult<()> {
        push_frame(&mut self.nodes, node, self.context.debug())
    }
}

impl<W: io::Write> DataWriter for BinaryDataWriter<'_, W> {
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
        self.put_tag(tag::NAMED_START_OF_REFERENCE_NODE, name)?;
        self.put_type(ty)?;
        self.put_i32(id)?;
        self.push(NodeInfo::node(name, id, ty))
    }

    fn begin_struct_node(&mut self, name: Option<&str>, ty: Option<&'static TypeInfo>) -> SerialResult<()> {
        self.put_tag(tag::NAMED_START_OF_STRUCT_NODE, name)?;
        self.put_type(ty)?;
        self.push(NodeInfo::node(name, -1, ty))
    }

    fn end_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.put_u8(tag::END_OF_NODE)
    }

    fn begin_array_node(&mut self, len: i64) -> SerialResult<()> {
        self.put_u8(tag::START_OF_ARRAY)?;
        self.put_i64(len)?;
        self.push(NodeInfo::array())
    }

    fn end_array_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.put_u8(tag::END_OF_ARRAY)
    }

    fn write_primitive_array(&mut self, array: PrimitiveSlice<'_>) -> SerialResult<()> {
        self.put_u8(tag::PRIMITIVE_ARRAY)?;
        self.put_len(array.len())?;
        self.put_len(array.stride())?;

        let size = array.len() * array.stride();
        if self.buffer.len() + size <= BufferPool::BUFFER_SIZE {
            array.encode(self.big_endian, &mut self.buffer);
            return Ok(());
        }
        let mut bytes = Vec::with_capacity(size);
        array.encode(self.big_endian, &mut bytes);
        self.put(&bytes)
    }

    fn flush(&mut self) -> SerialResult<()> {
        self.flush_buffer()?;
        self.output
            .flush()
            .map_err(|err| self.context.debug().abort(alloc::format!("i/o failure: {err}")))
    }

    fn prepare_new_session(&mut self) {
        let config = self.context.config();
        self.big_endian = config.byte_order.is_big_endian();
        self.narrow_strings = config.narrow_strings;
        self.nodes.set_max_depth(config.max_depth);
        self.nodes.clear();
        self.types.clear();
    }

    fn write_null(&mut self, name: Option<&str>) -> SerialResult<()> {
        self.put_tag(tag::NAMED_NULL, name)
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) -> SerialResult<()> {
        self.put_tag(tag::NAMED_INTERNAL_REFERENCE, name)?;
        self.put_i32(id)
    }

    fn write_external_reference_index(&mut self, name: Option<&str>, index: i32) -> SerialResult<()> {
        self.put_tag(tag::NAMED_EXTERNAL_REFERENCE_BY_INDEX, name)?;
        self.put_i32(index)
    }

    fn write_external_reference_guid(&mut self, name: Option<&str>, guid: Guid) -> SerialResult<()> {
        self.put_tag(tag::NAMED_EXTERNAL_REFERENCE_BY_GUID, name)?;
        self.put_guid(guid)
    }

    fn write_external_reference_string(&mut self, name: Option<&str>, key: &str) -> SerialResult<()> {
        self.put_tag(tag::NAMED_EXTERNAL_REFERENCE_BY_STRING, name)?;
        self.put_str(key)
    }

    write_values! {
        write_bool(bool) => tag::NAMED_BOOL, put_bool;
        write_i8(i8) => tag::NAMED_I8, put_i8;
        write_u8(u8) => tag::NAMED_U8, put_u8;
        write_i16(i16) => tag::NAMED_I16, put_i16;
        write_u16(u16) => tag::NAMED_U16, put_u16;
        write_i32(i32) => tag::NAMED_I32, put_i32;
        write_u32(u32) => tag::NAMED_U32, put_u32;
        write_i64(i64) => tag::NAMED_I64, put_i64;
        write_u64(u64) => tag::NAMED_U64, put_u64;
        write_f32(f32) => tag::NAMED_F32, put_f32;
        write_f64(f64) => tag::NAMED_F64, put_f64;
        write_decimal(Decimal) => tag::NAMED_DECIMAL, put_decimal;
        write_char(char) => tag::NAMED_CHAR, put_char;
        write_guid(Guid) => tag::NAMED_GUID, put_guid;
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) -> SerialResult<()> {
        self.put_tag(tag::NAMED_STRING, name)?;
        self.put_str(value)
    }
}
