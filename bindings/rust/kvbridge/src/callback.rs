//! Log, error and content change handlers.
//!
//! One handler per kind for the whole process. Registering stores the
//! handler and then turns native dispatch on; unregistering turns native
//! dispatch off and then clears the slot, so the native side never calls
//! into an empty slot it was told about. Strings from the native side are
//! copied before a handler sees them, and a panicking handler is caught
//! before it reaches the boundary.
//!
//! Registration for one kind is last-write-wins; callers that register
//! from several threads must serialize it themselves.

use crate::config::{ErrorType, LogLevel, RecoverStrategy};
use kvbridge_ffi::{
    kv_set_content_change_callback, kv_set_error_callback, kv_set_log_callback, KvErrorType,
    KvLogCallback, KvLogLevel, KvRecoverStrategy, KvStr,
};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A log record from the native side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Severity.
    pub level: LogLevel,
    /// Source file.
    pub file: String,
    /// Source line.
    pub line: u32,
    /// Function or module.
    pub function: String,
    /// Text.
    pub message: String,
}

type LogHandler = Arc<dyn Fn(&LogMessage) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&str, ErrorType) -> RecoverStrategy + Send + Sync>;
type ContentChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

static LOG_SLOT: RwLock<Option<LogHandler>> = parking_lot::const_rwlock(None);
static ERROR_SLOT: RwLock<Option<ErrorHandler>> = parking_lot::const_rwlock(None);
static CONTENT_CHANGE_SLOT: RwLock<Option<ContentChangeHandler>> = parking_lot::const_rwlock(None);

/// Receives native log records instead of `tracing`.
pub fn register_log_handler(handler: impl Fn(&LogMessage) + Send + Sync + 'static) {
    kv_set_log_callback(Some(install_log_handler(handler)));
}

/// Sends native log records back to `tracing`.
pub fn unregister_log_handler() {
    kv_set_log_callback(None);
    *LOG_SLOT.write() = None;
}

/// Decides what happens to damaged stores. Without a handler they are
/// discarded.
pub fn register_error_handler(
    handler: impl Fn(&str, ErrorType) -> RecoverStrategy + Send + Sync + 'static,
) {
    *ERROR_SLOT.write() = Some(Arc::new(handler));
    kv_set_error_callback(Some(error_trampoline));
}

/// Removes the error handler.
pub fn unregister_error_handler() {
    kv_set_error_callback(None);
    *ERROR_SLOT.write() = None;
}

/// Told with the store identifier whenever another process changed it.
pub fn register_content_change_handler(handler: impl Fn(&str) + Send + Sync + 'static) {
    *CONTENT_CHANGE_SLOT.write() = Some(Arc::new(handler));
    kv_set_content_change_callback(Some(content_change_trampoline));
}

/// Removes the content change handler.
pub fn unregister_content_change_handler() {
    kv_set_content_change_callback(None);
    *CONTENT_CHANGE_SLOT.write() = None;
}

/// Fills the log slot and returns the function to hand to the native side.
pub(crate) fn install_log_handler(
    handler: impl Fn(&LogMessage) + Send + Sync + 'static,
) -> KvLogCallback {
    *LOG_SLOT.write() = Some(Arc::new(handler));
    log_trampoline
}

fn copy_view(view: KvStr) -> String {
    // SAFETY: views passed to callbacks are valid for the callback's duration.
    let bytes = unsafe { view.as_bytes() }.unwrap_or_default();
    String::from_utf8_lossy(bytes).into_owned()
}

extern "C" fn log_trampoline(
    level: KvLogLevel,
    file: KvStr,
    line: i32,
    function: KvStr,
    message: KvStr,
) {
    let Some(handler) = LOG_SLOT.read().clone() else {
        return;
    };
    let record = LogMessage {
        level: level.into(),
        file: copy_view(file),
        line: u32::try_from(line).unwrap_or(0),
        function: copy_view(function),
        message: copy_view(message),
    };
    if catch_unwind(AssertUnwindSafe(|| handler(&record))).is_err() {
        tracing::error!(target: "kvbridge", "log handler panicked");
    }
}

extern "C" fn error_trampoline(mmap_id: KvStr, error_type: KvErrorType) -> i32 {
    let discard = KvRecoverStrategy::Discard as i32;
    let Some(handler) = ERROR_SLOT.read().clone() else {
        return discard;
    };
    let mmap_id = copy_view(mmap_id);
    match catch_unwind(AssertUnwindSafe(|| handler(&mmap_id, error_type.into()))) {
        Ok(strategy) => KvRecoverStrategy::from(strategy) as i32,
        Err(_) => {
            tracing::error!(target: "kvbridge", mmap_id = %mmap_id, "error handler panicked, discarding");
            discard
        }
    }
}

extern "C" fn content_change_trampoline(mmap_id: KvStr) {
    let Some(handler) = CONTENT_CHANGE_SLOT.read().clone() else {
        return;
    };
    let mmap_id = copy_view(mmap_id);
    if catch_unwind(AssertUnwindSafe(|| handler(&mmap_id))).is_err() {
        tracing::error!(target: "kvbridge", mmap_id = %mmap_id, "content change handler panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Calls the trampolines directly; no native dispatch is turned on.
    #[test]
    fn empty_slots_are_silent() {
        assert_eq!(
            error_trampoline(KvStr::from_str("x"), KvErrorType::FileLength),
            KvRecoverStrategy::Discard as i32
        );
        content_change_trampoline(KvStr::from_str("x"));
    }

    #[test]
    fn views_are_copied_lossily() {
        assert_eq!(copy_view(KvStr::from_str("abc")), "abc");
        assert_eq!(copy_view(KvStr::null()), "");
        assert_eq!(copy_view(KvStr::from_bytes(&[b'a', 0xff])), "a\u{fffd}");
    }
}
