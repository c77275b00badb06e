use crate::debug::DebugContext;
use crate::error::{Abort, HookError, SerialResult};
use crate::info::{DeserializeHook, SerializeHook, TypeInfo};
use crate::reflect::Reflect;

/// Runs a write-side hook if one is declared.
pub(crate) fn run_serialize_hook(
    hook: Option<SerializeHook>,
    stage: &str,
    owner: &TypeInfo,
    value: &dyn Reflect,
    debug: &DebugContext,
) -> SerialResult<()> {
    match hook {
        Some(hook) => hook(value).or_else(|err| hook_failed(err, stage, owner, debug)),
        None => Ok(()),
    }
}

/// Runs a read-side hook if one is declared.
pub(crate) fn run_deserialize_hook(
    hook: Option<DeserializeHook>,
    stage: &str,
    owner: &TypeInfo,
    value: &mut dyn Reflect,
    debug: &DebugContext,
) -> SerialResult<()> {
    match hook {
        Some(hook) => hook(value).or_else(|err| hook_failed(err, stage, owner, debug)),
        None => Ok(()),
    }
}

/// An [`Abort`] unwinds the session, any other error is only reported.
fn hook_failed(err: HookError, stage: &str, owner: &TypeInfo, debug: &DebugContext) -> SerialResult<()> {
    match err.downcast::<Abort>() {
        Ok(abort) => Err(*abort),
        Err(err) => debug.log_error(format_args!(
            "`{stage}` hook of `{}` failed: {err}",
            owner.type_path()
        )),
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::*;
    use crate::debug::{ErrorHandlingPolicy, LoggingPolicy, MemoryLogger, Severity};
    use crate::info::Typed;

    fn debug() -> (DebugContext, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let debug = DebugContext::new(LoggingPolicy::LogWarningsAndErrors, ErrorHandlingPolicy::Resilient)
            .with_logger(logger.clone());
        (debug, logger)
    }

    #[test]
    fn plain_errors_are_logged() {
        let (debug, logger) = debug();
        let hook: SerializeHook = |_| Err("not ready".into());
        run_serialize_hook(Some(hook), "before_serialize", u8::type_info(), &1_u8, &debug).unwrap();
        assert_eq!(logger.count(Severity::Error), 1);
        assert!(logger.contains("not ready"));
    }

    #[test]
    fn aborts_propagate() {
        let (debug, _) = debug();
        let hook: DeserializeHook = |_| Err(Box::new(Abort::new("stop")));
        let err = run_deserialize_hook(Some(hook), "after_deserialize", u8::type_info(), &mut 1_u8, &debug)
            .unwrap_err();
        assert_eq!(err.message(), "stop");
    }

    #[test]
    fn missing_hooks_do_nothing() {
        let (debug, logger) = debug();
        run_serialize_hook(None, "after_serialize", u8::type_info(), &1_u8, &debug).unwrap();
        assert!(logger.entries().is_empty());
    }
}
