#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_serial as serial;

pub use vc_serial::Shared;
pub use vc_serial::api::{DeserializeDriver, SerializeDriver};
pub use vc_serial::config::{DataFormat, SerializationConfig};
pub use vc_serial::derive::Reflect;
