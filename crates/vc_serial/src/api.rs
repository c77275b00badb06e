//! Entry points.
//!
//! [`SerializeDriver`] and [`DeserializeDriver`] own one session context
//! each and run a whole graph through a wire format per call. Contexts are
//! reset between calls; external resolvers stay installed.
//!
//! ```
//! use std::sync::Arc;
//! use vc_serial::api::{DeserializeDriver, SerializeDriver};
//! use vc_serial::config::{DataFormat, SerializationConfig};
//! use vc_serial::registry::Registry;
//!
//! let registry = Arc::new(Registry::new());
//! let mut ser = SerializeDriver::new(registry.clone(), SerializationConfig::default()).unwrap();
//! let mut de = DeserializeDriver::new(registry, SerializationConfig::default()).unwrap();
//!
//! let bytes = ser.serialize(&vec![1u32, 2, 3], DataFormat::Binary).unwrap();
//! let back: Vec<u32> = de.deserialize(&bytes, DataFormat::Binary).unwrap();
//! assert_eq!(back, [1, 2, 3]);
//! ```

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::io;

use crate::config::{DataFormat, SerializationConfig};
use crate::context::{DeserializationContext, SerializationContext};
use crate::error::{SerialResult, SerializeError};
use crate::format::{
    BinaryDataReader, BinaryDataWriter, DataReader, DataWriter, JsonDataReader, JsonDataWriter,
    SerializationNode, SerializationNodeDataReader, SerializationNodeDataWriter,
};
use crate::info::{TypeInfo, Typed};
use crate::reflect::Reflect;
use crate::registry::Registry;

/// Writes `value` as the unnamed root of a fresh stream.
///
/// Works with any [`DataWriter`], including host-provided ones.
pub fn write_root(
    value: &dyn Reflect,
    info: &'static TypeInfo,
    writer: &mut dyn DataWriter,
) -> SerialResult<()> {
    writer.prepare_new_session();
    writer.context_mut().reset();
    let dispatcher = writer.context().dispatcher(info);
    dispatcher.write_value(None, value, writer)?;
    writer.flush()
}

/// Reads the root of a fresh stream as a value of `info`.
pub fn read_root(
    info: &'static TypeInfo,
    reader: &mut dyn DataReader,
) -> SerialResult<Option<Box<dyn Reflect>>> {
    reader.prepare_new_session();
    reader.context_mut().reset();
    let dispatcher = reader.context().dispatcher(info);
    dispatcher.read_value(reader)
}

// -----------------------------------------------------------------------------
// SerializeDriver

/// Serializes object graphs with one reusable [`SerializationContext`].
#[derive(Debug)]
pub struct SerializeDriver {
    context: SerializationContext,
}

impl SerializeDriver {
    /// Fails if the configured policy is not registered.
    pub fn new(registry: Arc<Registry>, config: SerializationConfig) -> Result<Self, SerializeError> {
        Ok(Self {
            context: SerializationContext::new(registry, config)?,
        })
    }

    /// A driver over [`Registry::global`].
    pub fn with_global(config: SerializationConfig) -> Result<Self, SerializeError> {
        Self::new(Registry::global(), config)
    }

    #[inline]
    pub fn context(&self) -> &SerializationContext {
        &self.context
    }

    /// For installing resolvers, loggers or a binder.
    #[inline]
    pub fn context_mut(&mut self) -> &mut SerializationContext {
        &mut self.context
    }

    /// Serializes `value` into a new byte buffer.
    ///
    /// [`DataFormat::Nodes`] has no byte form, see
    /// [`SerializeDriver::serialize_nodes`].
    pub fn serialize<T: Reflect + Typed>(
        &mut self,
        value: &T,
        format: DataFormat,
    ) -> Result<Vec<u8>, SerializeError> {
        self.serialize_into(value, format, Vec::new())
    }

    /// Serializes `value` into `output` and hands it back.
    pub fn serialize_into<T: Reflect + Typed, W: io::Write>(
        &mut self,
        value: &T,
        format: DataFormat,
        output: W,
    ) -> Result<W, SerializeError> {
        let info = T::type_info();
        match format {
            DataFormat::Binary => {
                let mut writer = BinaryDataWriter::new(output, &mut self.context);
                write_root(value, info, &mut writer)?;
                Ok(writer.into_inner())
            }
            DataFormat::Json => {
                let mut writer = JsonDataWriter::new(output, &mut self.context);
                write_root(value, info, &mut writer)?;
                Ok(writer.into_inner())
            }
            DataFormat::Nodes => Err(SerializeError::UnsupportedFormat { format }),
        }
    }

    /// Serializes `value` into a node list.
    pub fn serialize_nodes<T: Reflect + Typed>(
        &mut self,
        value: &T,
    ) -> Result<Vec<SerializationNode>, SerializeError> {
        let mut writer = SerializationNodeDataWriter::new(&mut self.context);
        write_root(value, T::type_info(), &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Serializes `value` as text.
    pub fn serialize_json<T: Reflect + Typed>(&mut self, value: &T) -> Result<String, SerializeError> {
        let bytes = self.serialize(value, DataFormat::Json)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }
}

// -----------------------------------------------------------------------------
// DeserializeDriver

/// Deserializes object graphs with one reusable [`DeserializationContext`].
#[derive(Debug)]
pub struct DeserializeDriver {
    context: DeserializationContext,
}

impl DeserializeDriver {
    /// Fails if the configured policy is not registered.
    pub fn new(registry: Arc<Registry>, config: SerializationConfig) -> Result<Self, SerializeError> {
        Ok(Self {
            context: DeserializationContext::new(registry, config)?,
        })
    }

    /// A driver over [`Registry::global`].
    pub fn with_global(config: SerializationConfig) -> Result<Self, SerializeError> {
        Self::new(Registry::global(), config)
    }

    #[inline]
    pub fn context(&self) -> &DeserializationContext {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut DeserializationContext {
        &mut self.context
    }

    /// Reads a `T` from `bytes`.
    ///
    /// Recoverable problems in the stream are logged and replaced by
    /// defaults; [`SerializeError::MissingValue`] means not even the root
    /// could be read.
    pub fn deserialize<T: Reflect + Typed>(
        &mut self,
        bytes: &[u8],
        format: DataFormat,
    ) -> Result<T, SerializeError> {
        let info = T::type_info();
        let root = match format {
            DataFormat::Binary => read_root(info, &mut BinaryDataReader::new(bytes, &mut self.context))?,
            DataFormat::Json => {
                let text = String::from_utf8_lossy(bytes);
                read_root(info, &mut JsonDataReader::new(text, &mut self.context))?
            }
            DataFormat::Nodes => return Err(SerializeError::UnsupportedFormat { format }),
        };
        take_root(root, info)
    }

    /// Reads a `T` from everything `source` has left.
    pub fn deserialize_from<T: Reflect + Typed>(
        &mut self,
        source: impl io::Read,
        format: DataFormat,
    ) -> Result<T, SerializeError> {
        let info = T::type_info();
        let root = match format {
            DataFormat::Binary => {
                read_root(info, &mut BinaryDataReader::from_reader(source, &mut self.context)?)?
            }
            DataFormat::Json => {
                read_root(info, &mut JsonDataReader::from_reader(source, &mut self.context)?)?
            }
            DataFormat::Nodes => return Err(SerializeError::UnsupportedFormat { format }),
        };
        take_root(root, info)
    }

    /// Reads a `T` from text.
    pub fn deserialize_json<T: Reflect + Typed>(&mut self, text: &str) -> Result<T, SerializeError> {
        let info = T::type_info();
        let root = read_root(info, &mut JsonDataReader::new(Cow::Borrowed(text), &mut self.context))?;
        take_root(root, info)
    }

    /// Reads a `T` from a node list.
    pub fn from_nodes<T: Reflect + Typed>(&mut self, nodes: &[SerializationNode]) -> Result<T, SerializeError> {
        let info = T::type_info();
        let root = read_root(info, &mut SerializationNodeDataReader::new(nodes, &mut self.context))?;
        take_root(root, info)
    }
}

fn take_root<T: Reflect>(root: Option<Box<dyn Reflect>>, info: &'static TypeInfo) -> Result<T, SerializeError> {
    let missing = || SerializeError::MissingValue {
        type_path: info.type_path(),
    };
    root.ok_or_else(missing)?.take::<T>().map_err(|_| missing())
}
