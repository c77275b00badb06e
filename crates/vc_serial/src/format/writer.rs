use crate::context::SerializationContext;
use crate::debug::DebugContext;
use crate::error::SerialResult;
use crate::format::{NodeInfo, NodeStack, PrimitiveSlice};
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::{Decimal, Guid, Reflect};

/// A push writer over one wire format.
///
/// Entries inside a node are named, entries inside an array are not. The
/// root value is written unnamed.
pub trait DataWriter {
    fn context(&self) -> &SerializationContext;

    fn context_mut(&mut self) -> &mut SerializationContext;

    fn nodes(&self) -> &NodeStack;

    #[inline]
    fn debug(&self) -> &DebugContext {
        self.context().debug()
    }

    // -------------------------------------------------------------------------
    // Structure

    /// Opens a node for a shared object with internal id `id`.
    fn begin_reference_node(
        &mut self,
        name: Option<&str>,
        ty: Option<&'static TypeInfo>,
        id: i32,
    ) -> SerialResult<()>;

    /// Opens a node for a value without identity.
    fn begin_struct_node(&mut self, name: Option<&str>, ty: Option<&'static TypeInfo>) -> SerialResult<()>;

    fn end_node(&mut self) -> SerialResult<()>;

    /// Opens an array of `len` unnamed entries inside the current node.
    fn begin_array_node(&mut self, len: i64) -> SerialResult<()>;

    fn end_array_node(&mut self) -> SerialResult<()>;

    /// Writes a run of fixed-stride primitives inside the current node.
    fn write_primitive_array(&mut self, array: PrimitiveSlice<'_>) -> SerialResult<()>;

    /// Pushes the remaining bytes to the output.
    fn flush(&mut self) -> SerialResult<()>;

    /// Clears the node stack and per-stream tables for the next stream.
    fn prepare_new_session(&mut self);

    // -------------------------------------------------------------------------
    // References

    fn write_null(&mut self, name: Option<&str>) -> SerialResult<()>;

    fn write_internal_reference(&mut self, name: Option<&str>, id: i32) -> SerialResult<()>;

    fn write_external_reference_index(&mut self, name: Option<&str>, index: i32) -> SerialResult<()>;

    fn write_external_reference_guid(&mut self, name: Option<&str>, guid: Guid) -> SerialResult<()>;

    fn write_external_reference_string(&mut self, name: Option<&str>, key: &str) -> SerialResult<()>;

    // -------------------------------------------------------------------------
    // Primitives

    fn write_bool(&mut self, name: Option<&str>, value: bool) -> SerialResult<()>;
    fn write_i8(&mut self, name: Option<&str>, value: i8) -> SerialResult<()>;
    fn write_u8(&mut self, name: Option<&str>, value: u8) -> SerialResult<()>;
    fn write_i16(&mut self, name: Option<&str>, value: i16) -> SerialResult<()>;
    fn write_u16(&mut self, name: Option<&str>, value: u16) -> SerialResult<()>;
    fn write_i32(&mut self, name: Option<&str>, value: i32) -> SerialResult<()>;
    fn write_u32(&mut self, name: Option<&str>, value: u32) -> SerialResult<()>;
    fn write_i64(&mut self, name: Option<&str>, value: i64) -> SerialResult<()>;
    fn write_u64(&mut self, name: Option<&str>, value: u64) -> SerialResult<()>;
    fn write_f32(&mut self, name: Option<&str>, value: f32) -> SerialResult<()>;
    fn write_f64(&mut self, name: Option<&str>, value: f64) -> SerialResult<()>;
    fn write_decimal(&mut self, name: Option<&str>, value: Decimal) -> SerialResult<()>;
    fn write_char(&mut self, name: Option<&str>, value: char) -> SerialResult<()>;
    fn write_string(&mut self, name: Option<&str>, value: &str) -> SerialResult<()>;
    fn write_guid(&mut self, name: Option<&str>, value: Guid) -> SerialResult<()>;

    /// Writes `value` as a single primitive entry.
    ///
    /// Returns `false` and writes nothing if `value` is not a primitive.
    /// `isize` and `usize` travel as 64-bit integers.
    fn write_primitive(&mut self, name: Option<&str>, value: &dyn Reflect) -> SerialResult<bool> {
        let Some(kind) = value.reflect_type_info().as_primitive() else {
            return Ok(false);
        };
        macro_rules! put {
            ($ty:ty, $write:ident) => {
                match value.downcast_ref::<$ty>() {
                    Some(v) => self.$write(name, *v)?,
                    None => return Ok(false),
                }
            };
        }
        match kind {
            PrimitiveKind::Bool => put!(bool, write_bool),
            PrimitiveKind::I8 => put!(i8, write_i8),
            PrimitiveKind::U8 => put!(u8, write_u8),
            PrimitiveKind::I16 => put!(i16, write_i16),
            PrimitiveKind::U16 => put!(u16, write_u16),
            PrimitiveKind::I32 => put!(i32, write_i32),
            PrimitiveKind::U32 => put!(u32, write_u32),
            PrimitiveKind::I64 => put!(i64, write_i64),
            PrimitiveKind::U64 => put!(u64, write_u64),
            PrimitiveKind::F32 => put!(f32, write_f32),
            PrimitiveKind::F64 => put!(f64, write_f64),
            PrimitiveKind::Decimal => put!(Decimal, write_decimal),
            PrimitiveKind::Char => put!(char, write_char),
            PrimitiveKind::Guid => put!(Guid, write_guid),
            PrimitiveKind::Isize => match value.downcast_ref::<isize>() {
                Some(v) => self.write_i64(name, *v as i64)?,
                None => return Ok(false),
            },
            PrimitiveKind::Usize => match value.downcast_ref::<usize>() {
                Some(v) => self.write_u64(name, *v as u64)?,
                None => return Ok(false),
            },
            PrimitiveKind::String => match value.downcast_ref::<alloc::string::String>() {
                Some(v) => self.write_string(name, v)?,
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}

/// Pushes `node` onto `nodes`, turning an exceeded depth cap into an abort.
pub(crate) fn push_frame(nodes: &mut NodeStack, node: NodeInfo, debug: &DebugContext) -> SerialResult<()> {
    nodes.push(node).map_err(|err| {
        debug.abort(alloc::format!(
            "nesting deeper than {} frames, the graph is likely unbounded",
            err.0
        ))
    })
}
