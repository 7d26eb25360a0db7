//! Process-wide native handler slots.
//!
//! One slot per kind: log, error policy and content change. Installing a
//! handler replaces the previous one; clearing a slot stops notifications
//! of that kind. Handlers are cloned out of the slot and invoked after the
//! slot lock is released, so a handler may install or clear handlers.
//!
//! Handlers must not call back into the store that triggered them.

use crate::log::LogRecord;
use parking_lot::RwLock;
use std::sync::Arc;

/// Kind of damage found while loading a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorType {
    /// The record region does not match the stored checksum.
    CrcCheckFail = 0,
    /// The header claims more data than the file holds.
    FileLength = 1,
}

impl From<i32> for ErrorType {
    fn from(code: i32) -> Self {
        match code {
            1 => ErrorType::FileLength,
            _ => ErrorType::CrcCheckFail,
        }
    }
}

/// What to do with a damaged store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum RecoverStrategy {
    /// Drop all data.
    #[default]
    Discard = 0,
    /// Keep every record that still parses.
    Recover = 1,
}

impl From<i32> for RecoverStrategy {
    fn from(code: i32) -> Self {
        match code {
            1 => RecoverStrategy::Recover,
            _ => RecoverStrategy::Discard,
        }
    }
}

/// Receives log records.
pub type LogHandler = Arc<dyn Fn(&LogRecord) + Send + Sync>;
/// Decides how to treat a damaged store.
pub type ErrorHandler = Arc<dyn Fn(&str, ErrorType) -> RecoverStrategy + Send + Sync>;
/// Told when another process changed a store.
pub type ContentChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

static LOG_HANDLER: RwLock<Option<LogHandler>> = parking_lot::const_rwlock(None);
static ERROR_HANDLER: RwLock<Option<ErrorHandler>> = parking_lot::const_rwlock(None);
static CONTENT_CHANGE_HANDLER: RwLock<Option<ContentChangeHandler>> =
    parking_lot::const_rwlock(None);

/// Installs or clears the log handler.
///
/// Without a handler, records go to `tracing`.
pub fn set_log_handler(handler: Option<LogHandler>) {
    *LOG_HANDLER.write() = handler;
}

/// Installs or clears the error handler.
///
/// Without a handler, damaged stores are discarded.
pub fn set_error_handler(handler: Option<ErrorHandler>) {
    *ERROR_HANDLER.write() = handler;
}

/// Installs or clears the content change handler.
pub fn set_content_change_handler(handler: Option<ContentChangeHandler>) {
    *CONTENT_CHANGE_HANDLER.write() = handler;
}

pub(crate) fn log_handler() -> Option<LogHandler> {
    LOG_HANDLER.read().clone()
}

pub(crate) fn on_error(mmap_id: &str, error_type: ErrorType) -> RecoverStrategy {
    let handler = ERROR_HANDLER.read().clone();
    match handler {
        Some(handler) => handler(mmap_id, error_type),
        None => RecoverStrategy::Discard,
    }
}

pub(crate) fn on_content_change(mmap_id: &str) {
    let handler = CONTENT_CHANGE_HANDLER.read().clone();
    if let Some(handler) = handler {
        handler(mmap_id);
    }
}

/// Serializes tests that touch the global slots.
#[cfg(test)]
pub(crate) static TEST_SLOT_GUARD: parking_lot::Mutex<()> = parking_lot::const_mutex(());
