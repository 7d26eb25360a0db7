//! Open options and the enums shared with the native side.

use kvbridge_ffi::{KvErrorType, KvLogLevel, KvMode, KvRecoverStrategy};
use std::path::{Path, PathBuf};

/// Process sharing mode of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Only this process uses the store.
    #[default]
    SingleProcess,
    /// Several processes share the store.
    MultiProcess,
}

impl From<Mode> for KvMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::SingleProcess => KvMode::SingleProcess,
            Mode::MultiProcess => KvMode::MultiProcess,
        }
    }
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Debug output.
    Debug,
    /// Informational.
    #[default]
    Info,
    /// Warnings.
    Warning,
    /// Errors.
    Error,
    /// Nothing.
    None,
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

/// Kind of damage found while loading a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The data does not match its checksum.
    CrcCheckFail,
    /// The data file is shorter than its header claims.
    FileLength,
}

impl From<KvErrorType> for ErrorType {
    fn from(error_type: KvErrorType) -> Self {
        match error_type {
            KvErrorType::CrcCheckFail => ErrorType::CrcCheckFail,
            KvErrorType::FileLength => ErrorType::FileLength,
        }
    }
}

/// What to do with a damaged store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecoverStrategy {
    /// Drop everything.
    #[default]
    Discard,
    /// Keep whatever still parses.
    Recover,
}

impl From<RecoverStrategy> for KvRecoverStrategy {
    fn from(strategy: RecoverStrategy) -> Self {
        match strategy {
            RecoverStrategy::Discard => KvRecoverStrategy::Discard,
            RecoverStrategy::Recover => KvRecoverStrategy::Recover,
        }
    }
}

/// Options for [`open`](crate::open).
///
/// The identifier and root directory name the store. Opening the same pair
/// again while it is open returns the same store, whatever the other
/// options say.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub(crate) id: String,
    pub(crate) mode: Mode,
    pub(crate) crypt_key: Option<Vec<u8>>,
    pub(crate) root: Option<PathBuf>,
    pub(crate) expected_capacity: u64,
}

impl OpenOptions {
    /// Options for the store named `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the process sharing mode.
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Encrypts the store with `key`. Only the first 16 bytes are used.
    #[must_use]
    pub fn crypt_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.crypt_key = Some(key.as_ref().to_vec());
        self
    }

    /// Places the store under `root` instead of the initialized directory.
    #[must_use]
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Sizes the file for about `bytes` of data up front.
    #[must_use]
    pub const fn expected_capacity(mut self, bytes: u64) -> Self {
        self.expected_capacity = bytes;
        self
    }
}
