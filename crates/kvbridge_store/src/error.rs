//! Error types for the kvbridge store.

use crate::value::ValueType;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// None of these cross the boundary. The FFI layer folds every error into
/// the default value, empty buffer or `false` of the call that produced it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No root directory was given and [`initialize`](crate::initialize)
    /// has not been called.
    #[error("store registry is not initialized")]
    NotInitialized,

    /// The store was closed or its storage removed.
    #[error("store is closed")]
    Closed,

    /// An argument was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// The data file does not hold what its header claims.
    #[error("file length mismatch: header claims {claimed} bytes, file holds {available}")]
    FileLength {
        /// Bytes the header says are in use.
        claimed: u64,
        /// Bytes actually present.
        available: u64,
    },

    /// Checksum mismatch between data and meta files.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum recorded in the meta file.
        expected: u32,
        /// Checksum computed over the data file.
        actual: u32,
    },

    /// A record or meta block could not be parsed.
    #[error("corrupted data: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A stored value has a different type than requested.
    #[error("type mismatch: stored {stored:?}, requested {requested:?}")]
    TypeMismatch {
        /// Type tag of the stored value.
        stored: ValueType,
        /// Type tag the caller asked for.
        requested: ValueType,
    },

    /// Encryption is not enabled.
    #[error("encryption feature not enabled")]
    EncryptionNotEnabled,

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Another process holds the store lock.
    #[error("store locked by another process")]
    Locked,

    /// Requested operation conflicts with the store's current settings.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an encryption not enabled error.
    pub fn encryption_not_enabled() -> Self {
        Self::EncryptionNotEnabled
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error means the data on disk is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::FileLength { .. } | Self::ChecksumMismatch { .. } | Self::Corrupted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::corrupted("truncated record");
        assert_eq!(err.to_string(), "corrupted data: truncated record");

        let err = StoreError::ChecksumMismatch {
            expected: 0xdead_beef,
            actual: 0x1234_5678,
        };
        assert!(err.to_string().contains("deadbeef"));
        assert!(err.to_string().contains("12345678"));
    }

    #[test]
    fn corruption_classification() {
        assert!(StoreError::corrupted("x").is_corruption());
        assert!(StoreError::FileLength {
            claimed: 10,
            available: 4
        }
        .is_corruption());
        assert!(!StoreError::Closed.is_corruption());
        assert!(!StoreError::invalid_argument("empty key").is_corruption());
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
