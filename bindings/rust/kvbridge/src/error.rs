//! Error types for the bindings.

use kvbridge_ffi::kv_last_error;
use std::ffi::CStr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for fallible binding calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the bindings.
///
/// Most store calls follow the native convention of returning a default
/// on failure; only calls with nothing sensible to default to return this.
#[derive(Debug, Error)]
pub enum Error {
    /// The native call failed.
    #[error("{operation} failed: {message}")]
    Native {
        /// Name of the failed operation.
        operation: &'static str,
        /// Message the native side left behind.
        message: String,
    },

    /// A path could not be passed as UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

impl Error {
    /// Builds an error from the native last-error message.
    pub(crate) fn native(operation: &'static str) -> Self {
        Error::Native {
            operation,
            message: last_error().unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// Message of the last failed native call on this thread.
pub fn last_error() -> Option<String> {
    let ptr = kv_last_error();
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null pointers from kv_last_error are NUL-terminated and
    // live until the next native call on this thread.
    let message = unsafe { CStr::from_ptr(ptr) };
    Some(message.to_string_lossy().into_owned())
}
