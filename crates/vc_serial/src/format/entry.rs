use alloc::string::String;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of the next unit in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Null,
    Boolean,
    Integer,
    FloatingPoint,
    String,
    Guid,
    StartOfNode,
    EndOfNode,
    StartOfArray,
    EndOfArray,
    PrimitiveArray,
    InternalReference,
    ExternalReferenceByIndex,
    ExternalReferenceByGuid,
    ExternalReferenceByString,
    EndOfStream,
    Invalid,
}

impl EntryType {
    /// Whether the entry closes a frame.
    #[inline]
    pub const fn is_end_marker(self) -> bool {
        matches!(self, Self::EndOfNode | Self::EndOfArray | Self::EndOfStream)
    }

    /// Whether the entry is a single primitive value.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Integer | Self::FloatingPoint | Self::String | Self::Guid
        )
    }

    /// The string used by the node-list format.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::FloatingPoint => "FloatingPoint",
            Self::String => "String",
            Self::Guid => "Guid",
            Self::StartOfNode => "StartOfNode",
            Self::EndOfNode => "EndOfNode",
            Self::StartOfArray => "StartOfArray",
            Self::EndOfArray => "EndOfArray",
            Self::PrimitiveArray => "PrimitiveArray",
            Self::InternalReference => "InternalReference",
            Self::ExternalReferenceByIndex => "ExternalReferenceByIndex",
            Self::ExternalReferenceByGuid => "ExternalReferenceByGuid",
            Self::ExternalReferenceByString => "ExternalReferenceByString",
            Self::EndOfStream => "EndOfStream",
            Self::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peeked entry: its kind and, for keyed entries, its field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryType,
    pub name: Option<String>,
}

impl Entry {
    #[inline]
    pub const fn unnamed(kind: EntryType) -> Self {
        Self { kind, name: None }
    }

    #[inline]
    pub fn named(kind: EntryType, name: Option<String>) -> Self {
        Self { kind, name }
    }
}
