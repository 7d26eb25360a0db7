//! Callback registration.
//!
//! A registered C function becomes the store's handler of that kind.
//! Registering `None` clears the handler, which stops native dispatch.
//! Every string passed to a callback is a view valid only during the call.

use crate::types::{KvErrorType, KvLogLevel, KvRecoverStrategy, KvStr};
use kvbridge_store::{
    set_content_change_handler, set_error_handler, set_log_handler, ContentChangeHandler,
    ErrorHandler, ErrorType, LogHandler, LogRecord, RecoverStrategy,
};
use std::sync::Arc;

/// Receives a log record: level, file, line, function and message.
pub type KvLogCallback =
    extern "C" fn(level: KvLogLevel, file: KvStr, line: i32, function: KvStr, message: KvStr);

/// Decides what to do with a damaged store. Returns a `KvRecoverStrategy`
/// code; unknown codes discard.
pub type KvErrorCallback = extern "C" fn(mmap_id: KvStr, error_type: KvErrorType) -> i32;

/// Told that another process changed a store.
pub type KvContentChangeCallback = extern "C" fn(mmap_id: KvStr);

fn log_handler(callback: KvLogCallback) -> LogHandler {
    Arc::new(move |record: &LogRecord| {
        callback(
            KvLogLevel::from(record.level),
            KvStr::from_str(record.file),
            i32::try_from(record.line).unwrap_or(i32::MAX),
            KvStr::from_str(record.function),
            KvStr::from_str(&record.message),
        );
    })
}

fn error_handler(callback: KvErrorCallback) -> ErrorHandler {
    Arc::new(move |mmap_id: &str, error_type: ErrorType| {
        let code = callback(KvStr::from_str(mmap_id), KvErrorType::from(error_type));
        RecoverStrategy::from(KvRecoverStrategy::from(code))
    })
}

fn content_change_handler(callback: KvContentChangeCallback) -> ContentChangeHandler {
    Arc::new(move |mmap_id: &str| callback(KvStr::from_str(mmap_id)))
}

/// Registers or clears the log callback.
///
/// Without a callback, log records go to the `tracing` subscriber.
#[no_mangle]
pub extern "C" fn kv_set_log_callback(callback: Option<KvLogCallback>) {
    set_log_handler(callback.map(log_handler));
}

/// Registers or clears the error callback.
///
/// Without a callback, damaged stores are discarded.
#[no_mangle]
pub extern "C" fn kv_set_error_callback(callback: Option<KvErrorCallback>) {
    set_error_handler(callback.map(error_handler));
}

/// Registers or clears the content change callback.
#[no_mangle]
pub extern "C" fn kv_set_content_change_callback(callback: Option<KvContentChangeCallback>) {
    set_content_change_handler(callback.map(content_change_handler));
}
