use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::debug::{DebugContext, ErrorHandlingPolicy, LoggingPolicy};

/// Wire representation selected for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    Binary,
    Json,
    Nodes,
}

/// Byte order of multi-byte binary fields, fixed at session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrderKind {
    #[default]
    Little,
    Big,
    /// Whatever the running host uses.
    Native,
}

impl ByteOrderKind {
    /// Resolves [`ByteOrderKind::Native`] against the running host.
    #[inline]
    pub const fn is_big_endian(self) -> bool {
        match self {
            Self::Little => false,
            Self::Big => true,
            Self::Native => cfg!(target_endian = "big"),
        }
    }
}

/// Knobs of one serialize or deserialize call.
///
/// Loadable from any serde format:
///
/// ```
/// use vc_serial::config::SerializationConfig;
///
/// let cfg: SerializationConfig = serde_json::from_str(r#"{ "policy": "strict" }"#).unwrap();
/// assert_eq!(cfg.policy, "strict");
/// assert!(!cfg.pretty_print);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Id of the member-selection policy.
    pub policy: String,
    pub logging: LoggingPolicy,
    pub error_handling: ErrorHandlingPolicy,
    /// Decode mismatching node types with the declared formatter anyway.
    pub allow_deserialize_invalid_data: bool,
    /// Newlines and four-space indentation in the text format.
    pub pretty_print: bool,
    /// Write 8-bit strings when every character fits.
    pub narrow_strings: bool,
    pub byte_order: ByteOrderKind,
    /// Hard cap on entries read for one node.
    pub max_node_entries: usize,
    /// Hard cap on node and array nesting.
    pub max_depth: usize,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            policy: String::from(crate::policy::STANDARD),
            logging: LoggingPolicy::default(),
            error_handling: ErrorHandlingPolicy::default(),
            allow_deserialize_invalid_data: false,
            pretty_print: false,
            narrow_strings: true,
            byte_order: ByteOrderKind::default(),
            max_node_entries: 10_000,
            max_depth: 1024,
        }
    }
}

impl SerializationConfig {
    /// The error channel described by this configuration.
    pub fn debug_context(&self) -> DebugContext {
        DebugContext::new(self.logging, self.error_handling)
    }
}
