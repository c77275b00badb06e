//! Dense binary form.
//!
//! One tag byte per entry; keyed entries use the odd tag and carry their
//! name right after it. Multi-byte fields use the byte order fixed by
//! [`SerializationConfig::byte_order`](crate::config::SerializationConfig)
//! at session start.

mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use reader::BinaryDataReader;
pub use writer::BinaryDataWriter;

use crate::format::EntryType;
use crate::info::PrimitiveKind;

/// Tag byte values. Where a pair exists only the named tag is listed, the
/// unnamed one is one higher.
pub(crate) mod tag {
    pub const NAMED_START_OF_REFERENCE_NODE: u8 = 1;
    pub const NAMED_START_OF_STRUCT_NODE: u8 = 3;
    pub const END_OF_NODE: u8 = 5;
    pub const START_OF_ARRAY: u8 = 6;
    pub const END_OF_ARRAY: u8 = 7;
    pub const PRIMITIVE_ARRAY: u8 = 8;
    pub const NAMED_INTERNAL_REFERENCE: u8 = 9;
    pub const NAMED_EXTERNAL_REFERENCE_BY_INDEX: u8 = 11;
    pub const NAMED_EXTERNAL_REFERENCE_BY_GUID: u8 = 13;
    pub const NAMED_I8: u8 = 15;
    pub const NAMED_U8: u8 = 17;
    pub const NAMED_I16: u8 = 19;
    pub const NAMED_U16: u8 = 21;
    pub const NAMED_I32: u8 = 23;
    pub const NAMED_U32: u8 = 25;
    pub const NAMED_I64: u8 = 27;
    pub const NAMED_U64: u8 = 29;
    pub const NAMED_F32: u8 = 31;
    pub const NAMED_F64: u8 = 33;
    pub const NAMED_DECIMAL: u8 = 35;
    pub const NAMED_CHAR: u8 = 37;
    pub const NAMED_STRING: u8 = 39;
    pub const NAMED_GUID: u8 = 41;
    pub const NAMED_BOOL: u8 = 43;
    pub const NAMED_NULL: u8 = 45;
    pub const UNNAMED_NULL: u8 = 46;
    pub const TYPE_NAME: u8 = 47;
    pub const TYPE_ID: u8 = 48;
    pub const END_OF_STREAM: u8 = 49;
    pub const NAMED_EXTERNAL_REFERENCE_BY_STRING: u8 = 50;
}

/// Entry type of `tag` and whether a name follows it.
pub(crate) fn classify(tag: u8) -> (EntryType, bool) {
    let named = match tag {
        1..=4 | 9..=46 => tag % 2 == 1,
        tag::NAMED_EXTERNAL_REFERENCE_BY_STRING => true,
        _ => false,
    };
    let kind = match tag {
        1..=4 => EntryType::StartOfNode,
        5 => EntryType::EndOfNode,
        6 => EntryType::StartOfArray,
        7 => EntryType::EndOfArray,
        8 => EntryType::PrimitiveArray,
        9 | 10 => EntryType::InternalReference,
        11 | 12 => EntryType::ExternalReferenceByIndex,
        13 | 14 => EntryType::ExternalReferenceByGuid,
        15..=30 => EntryType::Integer,
        31..=36 => EntryType::FloatingPoint,
        37..=40 => EntryType::String,
        41 | 42 => EntryType::Guid,
        43 | 44 => EntryType::Boolean,
        45 | 46 => EntryType::Null,
        tag::END_OF_STREAM => EntryType::EndOfStream,
        50 | 51 => EntryType::ExternalReferenceByString,
        _ => EntryType::Invalid,
    };
    (kind, named)
}

/// The primitive written under a value tag.
pub(crate) fn primitive_of(tag: u8) -> Option<PrimitiveKind> {
    // Pairs share the kind, normalize to the named tag.
    let named = if tag % 2 == 0 { tag.wrapping_sub(1) } else { tag };
    Some(match named {
        tag::NAMED_I8 => PrimitiveKind::I8,
        tag::NAMED_U8 => PrimitiveKind::U8,
        tag::NAMED_I16 => PrimitiveKind::I16,
        tag::NAMED_U16 => PrimitiveKind::U16,
        tag::NAMED_I32 => PrimitiveKind::I32,
        tag::NAMED_U32 => PrimitiveKind::U32,
        tag::NAMED_I64 => PrimitiveKind::I64,
        tag::NAMED_U64 => PrimitiveKind::U64,
        tag::NAMED_F32 => PrimitiveKind::F32,
        tag::NAMED_F64 => PrimitiveKind::F64,
        tag::NAMED_DECIMAL => PrimitiveKind::Decimal,
        tag::NAMED_CHAR => PrimitiveKind::Char,
        tag::NAMED_STRING => PrimitiveKind::String,
        tag::NAMED_GUID => PrimitiveKind::Guid,
        tag::NAMED_BOOL => PrimitiveKind::Bool,
        _ => return None,
    })
}

/// Compactness flag of a string: one byte per char.
pub(crate) const NARROW: u8 = 0;
/// Compactness flag of a string: UTF-16 code units.
pub(crate) const WIDE: u8 = 1;
