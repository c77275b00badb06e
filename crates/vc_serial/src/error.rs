use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;
use core::error::Error;

use thiserror::Error;

use crate::config::DataFormat;

/// The distinguished non-recoverable signal of a session.
///
/// Every internal frame returns [`SerialResult`], so an `Abort` travels
/// through `?` straight to the driver that started the session. Recoverable
/// problems are never represented by this type; they are reported through
/// [`DebugContext`](crate::debug::DebugContext) and replaced by defaults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("serialization aborted: {message}")]
pub struct Abort {
    message: Cow<'static, str>,
}

impl Abort {
    /// Creates an abort with the given message.
    #[inline]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reported reason.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type of every internal read or write step.
pub type SerialResult<T> = Result<T, Abort>;

/// Error returned by a lifecycle hook.
///
/// A hook error that is an [`Abort`] unwinds the session, anything else
/// is logged and the session continues.
pub type HookError = Box<dyn Error + Send + Sync>;

/// Errors surfaced by [`SerializeDriver`](crate::api::SerializeDriver) and
/// [`DeserializeDriver`](crate::api::DeserializeDriver).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializeError {
    #[error(transparent)]
    Aborted(#[from] Abort),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no value of type `{type_path}` could be read from the stream")]
    MissingValue { type_path: &'static str },
    #[error("policy `{id}` is not registered")]
    UnknownPolicy { id: String },
    #[error("{format:?} has no byte form")]
    UnsupportedFormat { format: DataFormat },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_display() {
        let abort = Abort::new("node entry limit reached");
        assert_eq!(abort.message(), "node entry limit reached");
        assert_eq!(
            alloc::format!("{abort}"),
            "serialization aborted: node entry limit reached"
        );
    }

    #[test]
    fn hook_error_downcasts_to_abort() {
        let err: HookError = Box::new(Abort::new("stop"));
        assert!(err.downcast_ref::<Abort>().is_some());

        let err: HookError = "plain".into();
        assert!(err.downcast_ref::<Abort>().is_none());
    }
}
