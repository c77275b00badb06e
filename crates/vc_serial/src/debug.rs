//! The error channel of a session.
//!
//! Recoverable problems are reported here at their point of origin. The
//! active [`ErrorHandlingPolicy`] decides whether a report escalates into
//! an [`Abort`].

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Abort, SerialResult};

/// Log target used by [`LogFacadeLogger`].
pub const LOG_TARGET: &str = "vc_serial";

/// How much of the error channel reaches the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggingPolicy {
    Silent,
    LogErrors,
    #[default]
    LogWarningsAndErrors,
}

/// Whether reports escalate into an [`Abort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorHandlingPolicy {
    /// Log and continue with a default value.
    #[default]
    Resilient,
    /// Errors abort, warnings are logged.
    ThrowOnErrors,
    /// Both warnings and errors abort.
    ThrowOnWarningsAndErrors,
}

/// Receives the reports of a session.
pub trait SerializationLogger: Send + Sync {
    fn log_warning(&self, message: &str);
    fn log_error(&self, message: &str);
    fn log_abort(&self, abort: &Abort);
}

/// Forwards reports to the [`log`] facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeLogger;

impl SerializationLogger for LogFacadeLogger {
    fn log_warning(&self, message: &str) {
        log::warn!(target: LOG_TARGET, "{message}");
    }

    fn log_error(&self, message: &str) {
        log::error!(target: LOG_TARGET, "{message}");
    }

    fn log_abort(&self, abort: &Abort) {
        log::error!(target: LOG_TARGET, "{abort}");
    }
}

/// Severity of a captured report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Abort,
}

/// A logger that keeps every report in memory.
///
/// Useful for hosts that surface serialization problems in their own UI.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every report so far.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reports of the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    /// Returns `true` if any report contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(_, m)| m.contains(needle))
    }

    fn push(&self, severity: Severity, message: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, message));
    }
}

impl SerializationLogger for MemoryLogger {
    fn log_warning(&self, message: &str) {
        self.push(Severity::Warning, message.into());
    }

    fn log_error(&self, message: &str) {
        self.push(Severity::Error, message.into());
    }

    fn log_abort(&self, abort: &Abort) {
        self.push(Severity::Abort, abort.message().into());
    }
}

/// Logger and policies of one session.
#[derive(Clone)]
pub struct DebugContext {
    logger: Arc<dyn SerializationLogger>,
    logging: LoggingPolicy,
    error_handling: ErrorHandlingPolicy,
}

impl fmt::Debug for DebugContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugContext")
            .field("logging", &self.logging)
            .field("error_handling", &self.error_handling)
            .finish_non_exhaustive()
    }
}

impl Default for DebugContext {
    fn default() -> Self {
        Self::new(LoggingPolicy::default(), ErrorHandlingPolicy::default())
    }
}

impl DebugContext {
    pub fn new(logging: LoggingPolicy, error_handling: ErrorHandlingPolicy) -> Self {
        Self {
            logger: Arc::new(LogFacadeLogger),
            logging,
            error_handling,
        }
    }

    /// Replaces the logger.
    pub fn with_logger(mut self, logger: Arc<dyn SerializationLogger>) -> Self {
        self.logger = logger;
        self
    }

    #[inline]
    pub fn logging(&self) -> LoggingPolicy {
        self.logging
    }

    #[inline]
    pub fn error_handling(&self) -> ErrorHandlingPolicy {
        self.error_handling
    }

    /// Reports a lost or approximated value.
    pub fn log_warning(&self, message: impl fmt::Display) -> SerialResult<()> {
        let message = alloc::format!("{message}");
        if self.logging == LoggingPolicy::LogWarningsAndErrors {
            self.logger.log_warning(&message);
        }
        if self.error_handling == ErrorHandlingPolicy::ThrowOnWarningsAndErrors {
            return Err(self.abort(message));
        }
        Ok(())
    }

    /// Reports a structural problem the session can step over.
    pub fn log_error(&self, message: impl fmt::Display) -> SerialResult<()> {
        let message = alloc::format!("{message}");
        if self.logging != LoggingPolicy::Silent {
            self.logger.log_error(&message);
        }
        if self.error_handling != ErrorHandlingPolicy::Resilient {
            return Err(self.abort(message));
        }
        Ok(())
    }

    /// Creates an abort signal and reports it.
    ///
    /// Aborts bypass the verbosity setting.
    pub fn abort(&self, message: impl Into<alloc::borrow::Cow<'static, str>>) -> Abort {
        let abort = Abort::new(message);
        self.logger.log_abort(&abort);
        abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(
        logging: LoggingPolicy,
        handling: ErrorHandlingPolicy,
    ) -> (DebugContext, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let ctx = DebugContext::new(logging, handling).with_logger(logger.clone());
        (ctx, logger)
    }

    #[test]
    fn resilient_never_aborts() {
        let (ctx, logger) = context(
            LoggingPolicy::LogWarningsAndErrors,
            ErrorHandlingPolicy::Resilient,
        );
        assert!(ctx.log_warning("lost field").is_ok());
        assert!(ctx.log_error("bad node").is_ok());
        assert_eq!(logger.count(Severity::Warning), 1);
        assert_eq!(logger.count(Severity::Error), 1);
    }

    #[test]
    fn verbosity_filters_reports() {
        let (ctx, logger) = context(LoggingPolicy::LogErrors, ErrorHandlingPolicy::Resilient);
        ctx.log_warning("hidden").unwrap();
        ctx.log_error("shown").unwrap();
        assert_eq!(logger.entries(), [(Severity::Error, "shown".into())]);

        let (ctx, logger) = context(LoggingPolicy::Silent, ErrorHandlingPolicy::Resilient);
        ctx.log_error("hidden").unwrap();
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn escalation() {
        let (ctx, logger) = context(LoggingPolicy::Silent, ErrorHandlingPolicy::ThrowOnErrors);
        assert!(ctx.log_warning("w").is_ok());
        let abort = ctx.log_error("e").unwrap_err();
        assert_eq!(abort.message(), "e");
        assert_eq!(logger.count(Severity::Abort), 1);

        let (ctx, _) = context(
            LoggingPolicy::Silent,
            ErrorHandlingPolicy::ThrowOnWarningsAndErrors,
        );
        assert!(ctx.log_warning("w").is_err());
    }
}
