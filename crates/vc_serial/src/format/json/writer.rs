use alloc::string::String;
use core::any::TypeId;
use core::fmt::Write as _;
use std::io;

use super::token::{EXTERNAL_GUID_REF, EXTERNAL_INDEX_REF, INTERNAL_REF, write_quoted};
use super::{ID, PRIMITIVE_CONTENT, PRIMITIVE_LENGTH, REGULAR_CONTENT, REGULAR_LENGTH, STRING_REF, TYPE};
use crate::context::SerializationContext;
use crate::error::SerialResult;
use crate::format::primitive_array::float_to_text;
use crate::format::writer::push_frame;
use crate::format::{DataWriter, NodeInfo, NodeStack, PrimitiveSlice};
use crate::hash::HashMap;
use crate::info::TypeInfo;
use crate::reflect::{Decimal, Guid};
use crate::registry::{BufferPool, PooledBuffer};

macro_rules! write_display {
    ($($name:ident($ty:ty);)*) => {$(
        fn $name(&mut self, name: Option<&str>, value: $ty) -> SerialResult<()> {
            self.begin_entry(name);
            let _ = write!(self.text, "{value}");
            self.spill()
        }
    )*};
}

/// Writes the JSON-like text form into any [`io::Write`].
///
/// Nodes are objects whose first members carry the `$id` and `$type`
/// sentinels; arrays live inside a node as `$rlength` / `$rcontent`.
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::config::SerializationConfig;
/// use vc_serial::context::SerializationContext;
/// use vc_serial::format::{DataWriter, JsonDataWriter};
/// use vc_serial::registry::Registry;
///
/// let mut context = SerializationContext::new(Arc::new(Registry::new()), SerializationConfig::default()).unwrap();
/// let mut writer = JsonDataWriter::new(Vec::new(), &mut context);
/// writer.begin_struct_node(None, None).unwrap();
/// writer.write_i32(Some("x"), 3).unwrap();
/// writer.write_string(Some("s"), "hi").unwrap();
/// writer.end_node().unwrap();
/// writer.flush().unwrap();
/// assert_eq!(writer.into_inner(), br#"{"x":3,"s":"hi"}"#);
/// ```
pub struct JsonDataWriter<'a, W: io::Write> {
    output: W,
    context: &'a mut SerializationContext,
    buffer: PooledBuffer,
    // text of the entry being written, moved to `buffer` by `spill`
    text: String,
    nodes: NodeStack,
    types: HashMap<TypeId, i32>,
    pretty: bool,
    indent: usize,
    needs_separator: bool,
}

impl<'a, W: io::Write> JsonDataWriter<'a, W> {
    pub fn new(output: W, context: &'a mut SerializationContext) -> Self {
        let config = context.config();
        let nodes = NodeStack::new(config.max_depth);
        let pretty = config.pretty_print;
        let buffer = context.registry().buffers().acquire();
        Self {
            output,
            context,
            buffer,
            text: String::new(),
            nodes,
            types: HashMap::default(),
            pretty,
            indent: 0,
            needs_separator: false,
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

    /// Moves the pending text into the scratch buffer, flushing it when full.
    fn spill(&mut self) -> SerialResult<()> {
        if self.buffer.len() + self.text.len() > BufferPool::BUFFER_SIZE {
            self.flush_buffer()?;
        }
        self.buffer.extend_from_slice(self.text.as_bytes());
        self.text.clear();
        if self.buffer.len() > BufferPool::BUFFER_SIZE {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn newline(&mut self) {
        if self.pretty {
            self.text.push('\n');
            for _ in 0..self.indent {
                self.text.push_str("    ");
            }
        }
    }

    /// Writes the separator and the key of the next entry.
    ///
    /// Keys are dropped inside arrays, where entries are positional.
    fn begin_entry(&mut self, name: Option<&str>) {
        if self.indent == 0 {
            // Consecutive root values go on their own line.
            if self.needs_separator {
                self.text.push('\n');
            }
        } else {
            if self.needs_separator {
                self.text.push(',');
            }
            self.newline();
        }
        self.needs_separator = true;
        if self.nodes.is_in_array() || self.indent == 0 {
            return;
        }
        if let Some(name) = name {
            write_quoted(name, &mut self.text);
            self.text.push(':');
            if self.pretty {
                self.text.push(' ');
            }
        }
    }

    fn open(&mut self, bracket: char) {
        self.text.push(bracket);
        self.indent += 1;
        self.needs_separator = false;
    }

    fn close(&mut self, bracket: char) {
        self.indent = self.indent.saturating_sub(1);
        self.newline();
        self.text.push(bracket);
        self.needs_separator = true;
    }

    fn write_type(&mut self, info: &'static TypeInfo) {
        self.begin_entry(Some(TYPE));
        if let Some(id) = self.types.get(&info.type_id()).copied() {
            let _ = write!(self.text, "{id}");
            return;
        }
        let id = self.types.len() as i32;
        self.types.insert(info.type_id(), id);
        let name = self.context.bind_to_name(info);
        write_quoted(&alloc::format!("{id}|{name}"), &mut self.text);
    }

    fn begin_node(
        &mut self,
        name: Option<&str>,
        ty: Option<&'static TypeInfo>,
        id: i32,
    ) -> SerialResult<()> {
        self.begin_entry(name);
        self.open('{');
        // The sentinels are keyed even when the node is an array item.
        push_frame(&mut self.nodes, NodeInfo::node(name, id, ty), self.context.debug())?;
        if id >= 0 {
            self.begin_entry(Some(ID));
            let _ = write!(self.text, "{id}");
        }
        if let Some(info) = ty {
            self.write_type(info);
        }
        self.spill()
    }

    fn write_literal(&mut self, name: Option<&str>, literal: &str) -> SerialResult<()> {
        self.begin_entry(name);
        self.text.push_str(literal);
        self.spill()
    }
}

impl<W: io::Write> DataWriter for JsonDataWriter<'_, W> {
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
        self.begin_node(name, ty, id)
    }

    fn begin_struct_node(&mut self, name: Option<&str>, ty: Option<&'static TypeInfo>) -> SerialResult<()> {
        self.begin_node(name, ty, -1)
    }

    fn end_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.close('}');
        self.spill()
    }

    fn begin_array_node(&mut self, len: i64) -> SerialResult<()> {
        self.begin_entry(Some(REGULAR_LENGTH));
        let _ = write!(self.text, "{len}");
        self.begin_entry(Some(REGULAR_CONTENT));
        self.open('[');
        push_frame(&mut self.nodes, NodeInfo::array(), self.context.debug())?;
        self.spill()
    }

    fn end_array_node(&mut self) -> SerialResult<()> {
        self.nodes.pop();
        self.close(']');
        self.spill()
    }

    fn write_primitive_array(&mut self, array: PrimitiveSlice<'_>) -> SerialResult<()> {
        self.begin_entry(Some(PRIMITIVE_LENGTH));
        let _ = write!(self.text, "{}", array.len());
        self.begin_entry(Some(PRIMITIVE_CONTENT));
        self.text.push('[');
        array.write_text(",", &mut self.text);
        self.text.push(']');
        self.spill()
    }

    fn flush(&mut self) -> SerialResult<()> {
        self.spill()?;
        self.flush_buffer()?;
        self.output
            .flush()
            .map_err(|err| self.context.debug().abort(alloc::format!("i/o failure: {err}")))
    }

    fn prepare_new_session(&mut self) {
        let config = self.context.config();
        self.pretty = config.pretty_print;
        self.nodes.set_max_depth(config.max_depth);
        self.nodes.clear();
        self.types.clear();
        self.indent = 0;
    }

    fn write_null(&mut self, name: Option<&str>) -> SerialResult<()> {
        self.write_literal(name, "null")
    }

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) -> SerialResult<()> {
        self.write_literal(name, &alloc::format!("{INTERNAL_REF}{id}"))
    }

    fn write_external_reference_index(&mut self, name: Option<&str>, index: i32) -> SerialResult<()> {
        self.write_literal(name, &alloc::format!("{EXTERNAL_INDEX_REF}{index}"))
    }

    fn write_external_reference_guid(&mut self, name: Option<&str>, guid: Guid) -> SerialResult<()> {
        self.write_literal(name, &alloc::format!("{EXTERNAL_GUID_REF}{}", guid.hyphenated()))
    }

    fn write_external_reference_string(&mut self, name: Option<&str>, key: &str) -> SerialResult<()> {
        self.begin_entry(name);
        self.text.push('{');
        write_quoted(STRING_REF, &mut self.text);
        self.text.push(':');
        write_quoted(key, &mut self.text);
        self.text.push('}');
        self.spill()
    }

    write_display! {
        write_bool(bool);
        write_i8(i8);
        write_u8(u8);
        write_i16(i16);
        write_u16(u16);
        write_i32(i32);
        write_u32(u32);
        write_i64(i64);
        write_u64(u64);
        write_decimal(Decimal);
    }

    fn write_f32(&mut self, name: Option<&str>, value: f32) -> SerialResult<()> {
        self.write_literal(name, &float_to_text(f64::from(value), true))
    }

    fn write_f64(&mut self, name: Option<&str>, value: f64) -> SerialResult<()> {
        self.write_literal(name, &float_to_text(value, false))
    }

    fn write_char(&mut self, name: Option<&str>, value: char) -> SerialResult<()> {
        let mut buf = [0u8; 4];
        self.write_string(name, value.encode_utf8(&mut buf))
    }

    fn write_string(&mut self, name: Option<&str>, value: &str) -> SerialResult<()> {
        self.begin_entry(name);
        write_quoted(value, &mut self.text);
        self.spill()
    }

    fn write_guid(&mut self, name: Option<&str>, value: Guid) -> SerialResult<()> {
        self.write_literal(name, &alloc::format!("{}", value.hyphenated()))
    }
}
