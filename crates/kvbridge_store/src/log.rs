//! Native log facility.
//!
//! Records carry the source location they were emitted from. When a log
//! handler is installed it receives every record at or above the minimum
//! level; otherwise records become `tracing` events under the `kvbridge`
//! target.

use crate::handler;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i32)]
pub enum LogLevel {
    /// Debug output.
    Debug = 0,
    /// Informational.
    #[default]
    Info = 1,
    /// Warnings.
    Warning = 2,
    /// Errors.
    Error = 3,
    /// Logging disabled.
    None = 4,
}

impl From<i32> for LogLevel {
    fn from(code: i32) -> Self {
        match code {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warning,
            3 => LogLevel::Error,
            _ => LogLevel::None,
        }
    }
}

static MIN_LEVEL: AtomicI32 = AtomicI32::new(LogLevel::Info as i32);

/// Sets the minimum level that is emitted.
pub fn set_level(level: LogLevel) {
    MIN_LEVEL.store(level as i32, Ordering::Relaxed);
}

/// Returns the minimum level that is emitted.
pub fn level() -> LogLevel {
    LogLevel::from(MIN_LEVEL.load(Ordering::Relaxed))
}

/// A single log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Source file.
    pub file: &'static str,
    /// Source line.
    pub line: u32,
    /// Module the record came from.
    pub function: &'static str,
    /// Formatted message.
    pub message: String,
}

/// Emits a record. Use the `kv_*!` macros instead of calling this.
#[doc(hidden)]
pub fn emit(
    level: LogLevel,
    file: &'static str,
    line: u32,
    function: &'static str,
    args: fmt::Arguments<'_>,
) {
    if level == LogLevel::None || level < self::level() {
        return;
    }

    let record = LogRecord {
        level,
        file,
        line,
        function,
        message: args.to_string(),
    };

    match handler::log_handler() {
        Some(handler) => handler(&record),
        None => forward_to_tracing(&record),
    }
}

fn forward_to_tracing(record: &LogRecord) {
    let LogRecord {
        file,
        line,
        function,
        message,
        ..
    } = record;
    match record.level {
        LogLevel::Debug => tracing::debug!(target: "kvbridge", file, line, function, "{message}"),
        LogLevel::Info => tracing::info!(target: "kvbridge", file, line, function, "{message}"),
        LogLevel::Warning => tracing::warn!(target: "kvbridge", file, line, function, "{message}"),
        LogLevel::Error => tracing::error!(target: "kvbridge", file, line, function, "{message}"),
        LogLevel::None => {}
    }
}

/// Logs at debug level.
#[macro_export]
macro_rules! kv_debug {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::LogLevel::Debug, file!(), line!(), module_path!(), format_args!($($arg)*))
    };
}

/// Logs at info level.
#[macro_export]
macro_rules! kv_info {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::LogLevel::Info, file!(), line!(), module_path!(), format_args!($($arg)*))
    };
}

/// Logs at warning level.
#[macro_export]
macro_rules! kv_warn {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::LogLevel::Warning, file!(), line!(), module_path!(), format_args!($($arg)*))
    };
}

/// Logs at error level.
#[macro_export]
macro_rules! kv_error {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::LogLevel::Error, file!(), line!(), module_path!(), format_args!($($arg)*))
    };
}
