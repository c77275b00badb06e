use alloc::boxed::Box;
use alloc::string::String;

use crate::context::DeserializationContext;
use crate::debug::DebugContext;
use crate::error::SerialResult;
use crate::format::{Entry, EntryType, NodeStack, PrimitiveArray};
use crate::info::{PrimitiveKind, TypeInfo};
use crate::reflect::{Decimal, Guid, Reflect};

/// What [`DataReader::enter_node`] found in a node header.
#[derive(Debug, Clone)]
pub struct NodeHeader {
    /// Internal reference id, `-1` for struct nodes.
    pub id: i32,
    /// The embedded type, if one was written and could be bound.
    pub ty: Option<&'static TypeInfo>,
    /// The embedded type name as written, kept when binding failed.
    pub type_name: Option<String>,
}

impl NodeHeader {
    /// `true` if the stream named a type the binder could not resolve.
    #[inline]
    pub fn is_unresolved(&self) -> bool {
        self.ty.is_none() && self.type_name.is_some()
    }
}

macro_rules! narrowing_reads {
    ($($(#[$attr:meta])* $name:ident -> $ty:ty;)*) => {
        $(
            $(#[$attr])*
            fn $name(&mut self) -> SerialResult<Option<$ty>> {
                let Some(value) = self.read_integer()? else {
                    return Ok(None);
                };
                match <$ty>::try_from(value) {
                    Ok(value) => Ok(Some(value)),
                    Err(_) => {
                        self.debug().log_warning(format_args!(
                            "integer {value} is out of range for `{}`",
                            stringify!($ty)
                        ))?;
                        Ok(None)
                    }
                }
            }
        )*
    };
}

/// A pull reader over one wire format.
///
/// Every read first peeks the next entry. A read whose entry does not match
/// reports a warning, skips the entry and yields `None`, so callers always
/// make progress. End markers are never consumed by a mismatching read.
pub trait DataReader {
    fn context(&self) -> &DeserializationContext;

    fn context_mut(&mut self) -> &mut DeserializationContext;

    fn nodes(&self) -> &NodeStack;

    #[inline]
    fn debug(&self) -> &DebugContext {
        self.context().debug()
    }

    // -------------------------------------------------------------------------
    // Structure

    /// The next entry, without consuming it.
    fn peek_entry(&mut self) -> SerialResult<Entry>;

    /// Consumes a node header and pushes its frame.
    ///
    /// Returns `None` and consumes nothing if the next entry is not a node.
    fn enter_node(&mut self) -> SerialResult<Option<NodeHeader>>;

    /// Skips what is left of the current node, its end marker included.
    fn exit_node(&mut self) -> SerialResult<()>;

    /// Consumes an array header and pushes its frame, returning the length.
    fn enter_array(&mut self) -> SerialResult<Option<i64>>;

    /// Skips what is left of the current array, its end marker included.
    fn exit_array(&mut self) -> SerialResult<()>;

    /// Reads a primitive array whose elements are of `kind`.
    fn read_primitive_array(&mut self, kind: PrimitiveKind) -> SerialResult<Option<PrimitiveArray>>;

    /// Discards the next entry without decoding it, recursing into nodes and
    /// arrays. Does nothing on an end marker.
    fn skip_entry(&mut self) -> SerialResult<()>;

    /// Clears the node stack and per-stream tables for the next stream.
    fn prepare_new_session(&mut self);

    // -------------------------------------------------------------------------
    // References

    fn read_internal_reference(&mut self) -> SerialResult<Option<i32>>;

    fn read_external_reference_index(&mut self) -> SerialResult<Option<i32>>;

    fn read_external_reference_guid(&mut self) -> SerialResult<Option<Guid>>;

    fn read_external_reference_string(&mut self) -> SerialResult<Option<String>>;

    /// Consumes a null entry; `false` if the next entry is something else.
    fn read_null(&mut self) -> SerialResult<bool>;

    // -------------------------------------------------------------------------
    // Primitives

    fn read_bool(&mut self) -> SerialResult<Option<bool>>;

    /// Reads any integer entry, whatever width it was written with.
    fn read_integer(&mut self) -> SerialResult<Option<i128>>;

    /// Reads a floating point entry, accepting integer and decimal entries.
    fn read_float(&mut self) -> SerialResult<Option<f64>>;

    fn read_decimal(&mut self) -> SerialResult<Option<Decimal>>;

    fn read_char(&mut self) -> SerialResult<Option<char>>;

    fn read_string(&mut self) -> SerialResult<Option<String>>;

    fn read_guid(&mut self) -> SerialResult<Option<Guid>>;

    /// The exact primitive kind of the next entry, where the format keeps
    /// it. Text formats only know the broad entry type.
    fn peek_primitive_kind(&mut self) -> SerialResult<Option<PrimitiveKind>> {
        Ok(match self.peek_entry()?.kind {
            EntryType::Boolean => Some(PrimitiveKind::Bool),
            EntryType::Integer => Some(PrimitiveKind::I64),
            EntryType::FloatingPoint => Some(PrimitiveKind::F64),
            EntryType::String => Some(PrimitiveKind::String),
            EntryType::Guid => Some(PrimitiveKind::Guid),
            _ => None,
        })
    }

    narrowing_reads! {
        read_i8 -> i8;
        read_u8 -> u8;
        read_i16 -> i16;
        read_u16 -> u16;
        read_i32 -> i32;
        read_u32 -> u32;
        read_i64 -> i64;
        read_u64 -> u64;
        read_isize -> isize;
        read_usize -> usize;
    }

    fn read_f32(&mut self) -> SerialResult<Option<f32>> {
        Ok(self.read_float()?.map(|v| v as f32))
    }

    fn read_f64(&mut self) -> SerialResult<Option<f64>> {
        self.read_float()
    }

    /// Reads one primitive value of `kind`.
    fn read_primitive(&mut self, kind: PrimitiveKind) -> SerialResult<Option<Box<dyn Reflect>>> {
        macro_rules! boxed {
            ($read:ident) => {
                self.$read()?.map(|v| Box::new(v) as Box<dyn Reflect>)
            };
        }
        Ok(match kind {
            PrimitiveKind::Bool => boxed!(read_bool),
            PrimitiveKind::I8 => boxed!(read_i8),
            PrimitiveKind::U8 => boxed!(read_u8),
            PrimitiveKind::I16 => boxed!(read_i16),
            PrimitiveKind::U16 => boxed!(read_u16),
            PrimitiveKind::I32 => boxed!(read_i32),
            PrimitiveKind::U32 => boxed!(read_u32),
            PrimitiveKind::I64 => boxed!(read_i64),
            PrimitiveKind::U64 => boxed!(read_u64),
            PrimitiveKind::Isize => boxed!(read_isize),
            PrimitiveKind::Usize => boxed!(read_usize),
            PrimitiveKind::F32 => boxed!(read_f32),
            PrimitiveKind::F64 => boxed!(read_f64),
            PrimitiveKind::Decimal => boxed!(read_decimal),
            PrimitiveKind::Char => boxed!(read_char),
            PrimitiveKind::String => boxed!(read_string),
            PrimitiveKind::Guid => boxed!(read_guid),
        })
    }

    /// Reads a primitive entry in whatever kind the stream recorded.
    fn read_boxed_primitive(&mut self) -> SerialResult<Option<Box<dyn Reflect>>> {
        match self.peek_primitive_kind()? {
            Some(kind) => self.read_primitive(kind),
            None => {
                let entry = self.peek_entry()?;
                self.skip_unexpected("a primitive value", &entry)?;
                Ok(None)
            }
        }
    }

    /// Reports that `found` is not what the caller expected, then skips it.
    fn skip_unexpected(&mut self, expected: &str, found: &Entry) -> SerialResult<()> {
        match &found.name {
            Some(name) => self.debug().log_warning(format_args!(
                "expected {expected}, found {} entry `{name}`",
                found.kind
            ))?,
            None => self
                .debug()
                .log_warning(format_args!("expected {expected}, found {} entry", found.kind))?,
        }
        self.skip_entry()
    }

    // -------------------------------------------------------------------------
    // Node stack shortcuts

    /// Id of the innermost node, `-1` outside reference nodes.
    fn current_node_id(&self) -> i32 {
        self.nodes().current().map_or(-1, |n| n.id)
    }

    fn current_node_name(&self) -> Option<&str> {
        self.nodes().current().and_then(|n| n.name.as_deref())
    }

    #[inline]
    fn depth(&self) -> usize {
        self.nodes().depth()
    }
}

/// Skips entries until `end` is next.
///
/// Returns `false` if the stream or an enclosing frame ended first. Aborts
/// once more than `max_node_entries` entries were skipped.
pub(crate) fn skip_until_end<R: DataReader + ?Sized>(
    reader: &mut R,
    end: EntryType,
) -> SerialResult<bool> {
    let limit = reader.context().config().max_node_entries;
    let mut skipped = 0usize;
    loop {
        let entry = reader.peek_entry()?;
        if entry.kind == end {
            return Ok(true);
        }
        if entry.kind.is_end_marker() {
            reader
                .debug()
                .log_error(format_args!("found {} while looking for {end}", entry.kind))?;
            return Ok(false);
        }
        skipped += 1;
        if skipped > limit {
            let abort = reader.debug().abort(alloc::format!(
                "more than {limit} entries in one frame, the stream is likely corrupt"
            ));
            return Err(abort);
        }
        reader.skip_entry()?;
    }
}

/// Recursive part of [`DataReader::skip_entry`]: skips a node or an array.
///
/// Returns `false` if the next entry is neither.
pub(crate) fn skip_structure<R: DataReader + ?Sized>(
    reader: &mut R,
    kind: EntryType,
) -> SerialResult<bool> {
    match kind {
        EntryType::StartOfNode => {
            reader.enter_node()?;
            reader.exit_node()?;
            Ok(true)
        }
        EntryType::StartOfArray => {
            reader.enter_array()?;
            reader.exit_array()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
