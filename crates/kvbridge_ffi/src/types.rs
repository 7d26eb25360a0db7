//! Type definitions for FFI.

use kvbridge_store::{ErrorType, LogLevel, Mode, RecoverStrategy};

/// A borrowed `{pointer, length}` view into caller memory.
///
/// Valid for the duration of one call only; the native side never keeps
/// it. A null pointer means "absent"; a non-null pointer with length 0 is
/// present but empty.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KvStr {
    /// Pointer to the first byte, or null.
    pub ptr: *const u8,
    /// Length in bytes.
    pub len: usize,
}

impl KvStr {
    /// The absent view.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    /// Views a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    /// Views a string.
    pub fn from_str(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// Returns true if the view is absent.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Returns the viewed bytes, `None` when absent.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to `len` readable bytes that stay valid
    /// and unmodified for `'a`.
    pub unsafe fn as_bytes<'a>(&self) -> Option<&'a [u8]> {
        if self.ptr.is_null() {
            return None;
        }
        if self.len == 0 {
            return Some(&[]);
        }
        Some(std::slice::from_raw_parts(self.ptr, self.len))
    }

    /// Returns the viewed UTF-8 text, `None` when absent or not UTF-8.
    ///
    /// # Safety
    ///
    /// Same as [`as_bytes`](Self::as_bytes).
    pub unsafe fn as_str<'a>(&self) -> Option<&'a str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Integer token standing for an open store. `0` is the null handle.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KvHandle(pub u64);

impl KvHandle {
    /// The null handle.
    pub const NULL: KvHandle = KvHandle(0);

    /// Returns true for the null handle.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Process sharing mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvMode {
    /// One process.
    SingleProcess = 1,
    /// Several processes.
    MultiProcess = 2,
}

impl From<i32> for KvMode {
    fn from(code: i32) -> Self {
        match code {
            2 => KvMode::MultiProcess,
            _ => KvMode::SingleProcess,
        }
    }
}

impl From<KvMode> for Mode {
    fn from(mode: KvMode) -> Self {
        match mode {
            KvMode::SingleProcess => Mode::SingleProcess,
            KvMode::MultiProcess => Mode::MultiProcess,
        }
    }
}

/// Log severity.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvLogLevel {
    /// Debug output.
    Debug = 0,
    /// Informational.
    Info = 1,
    /// Warnings.
    Warning = 2,
    /// Errors.
    Error = 3,
    /// Logging disabled.
    None = 4,
}

impl From<i32> for KvLogLevel {
    fn from(code: i32) -> Self {
        KvLogLevel::from(LogLevel::from(code))
    }
}

impl From<LogLevel> for KvLogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => KvLogLevel::Debug,
            LogLevel::Info => KvLogLevel::Info,
            LogLevel::Warning => KvLogLevel::Warning,
            LogLevel::Error => KvLogLevel::Error,
            LogLevel::None => KvLogLevel::None,
        }
    }
}

impl From<KvLogLevel> for LogLevel {
    fn from(level: KvLogLevel) -> Self {
        match level {
            KvLogLevel::Debug => LogLevel::Debug,
            KvLogLevel::Info => LogLevel::Info,
            KvLogLevel::Warning => LogLevel::Warning,
            KvLogLevel::Error => LogLevel::Error,
            KvLogLevel::None => LogLevel::None,
        }
    }
}

/// Kind of damage reported to the error callback.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvErrorType {
    /// Checksum mismatch.
    CrcCheckFail = 0,
    /// Header claims more data than the file holds.
    FileLength = 1,
}

impl From<ErrorType> for KvErrorType {
    fn from(error_type: ErrorType) -> Self {
        match error_type {
            ErrorType::CrcCheckFail => KvErrorType::CrcCheckFail,
            ErrorType::FileLength => KvErrorType::FileLength,
        }
    }
}

/// Answer of the error callback.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvRecoverStrategy {
    /// Drop all data.
    Discard = 0,
    /// Keep what still parses.
    Recover = 1,
}

impl From<i32> for KvRecoverStrategy {
    fn from(code: i32) -> Self {
        match code {
            1 => KvRecoverStrategy::Recover,
            _ => KvRecoverStrategy::Discard,
        }
    }
}

impl From<KvRecoverStrategy> for RecoverStrategy {
    fn from(strategy: KvRecoverStrategy) -> Self {
        match strategy {
            KvRecoverStrategy::Discard => RecoverStrategy::Discard,
            KvRecoverStrategy::Recover => RecoverStrategy::Recover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_views_differ() {
        let null = KvStr::null();
        assert!(null.is_null());
        assert_eq!(unsafe { null.as_bytes() }, None);

        let empty = KvStr::from_str("");
        assert!(!empty.is_null());
        assert_eq!(unsafe { empty.as_bytes() }, Some(&[][..]));
    }

    #[test]
    fn view_reads_text() {
        let text = String::from("héllo");
        let view = KvStr::from_str(&text);
        assert_eq!(unsafe { view.as_str() }, Some("héllo"));

        let invalid = [0xffu8, 0xfe];
        assert_eq!(unsafe { KvStr::from_bytes(&invalid).as_str() }, None);
    }

    #[test]
    fn out_of_range_codes_fall_back() {
        assert_eq!(KvMode::from(7), KvMode::SingleProcess);
        assert_eq!(KvLogLevel::from(-1), KvLogLevel::None);
        assert_eq!(KvRecoverStrategy::from(9), KvRecoverStrategy::Discard);
    }

    #[test]
    fn null_handle() {
        assert!(KvHandle::NULL.is_null());
        assert!(!KvHandle(3).is_null());
    }
}
