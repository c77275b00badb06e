//! Wire formats.
//!
//! Every format is a pair of a [`DataWriter`] and a [`DataReader`] sharing
//! one entry model ([`EntryType`]) and one nesting model ([`NodeStack`]).
//! Dispatchers and formatters only talk to these traits, so a graph written
//! in one format reads back the same in any other.

mod binary;
mod entry;
#[cfg(test)]
pub(crate) mod every_kind;
mod json;
mod node;
mod nodes;
pub(crate) mod primitive_array;
pub(crate) mod reader;
pub(crate) mod writer;

pub use binary::{BinaryDataReader, BinaryDataWriter};
pub use entry::{Entry, EntryType};
pub use json::{JsonDataReader, JsonDataWriter};
pub use node::{DepthExceeded, NodeInfo, NodeStack};
pub use nodes::{SerializationNode, SerializationNodeDataReader, SerializationNodeDataWriter};
pub use primitive_array::{PrimitiveArray, PrimitiveSlice};
pub use reader::{DataReader, NodeHeader};
pub use writer::DataWriter;

