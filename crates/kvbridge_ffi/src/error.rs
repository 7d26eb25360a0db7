//! Failure reporting across the boundary.
//!
//! No error value crosses the C ABI. A failed call returns its default
//! (`false`, `0`, a null buffer or the caller's fallback value) and leaves
//! a message readable through `kv_last_error` on the same thread.

use crate::handles;
use crate::types::{KvHandle, KvStr};
use kvbridge_store::{Store, StoreError, StoreResult};
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Gets the last error message of this thread, or null.
///
/// The returned pointer is valid until the next kvbridge call on this
/// thread.
#[no_mangle]
pub extern "C" fn kv_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Runs `f`, turning errors and panics into `default`.
pub(crate) fn guard<R>(default: R, f: impl FnOnce() -> StoreResult<R>) -> R {
    clear_last_error();
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            set_last_error(err.to_string());
            default
        }
        Err(_) => {
            set_last_error("panic inside kvbridge");
            default
        }
    }
}

/// Runs `f` against the store behind `handle`.
///
/// Null, stale and closed handles resolve to no store and yield `default`.
pub(crate) fn with_store<R>(
    handle: KvHandle,
    default: R,
    f: impl FnOnce(&Store) -> StoreResult<R>,
) -> R {
    guard(default, || {
        let store = handles::resolve(handle).ok_or(StoreError::Closed)?;
        f(&store)
    })
}

/// Reads a required UTF-8 argument.
///
/// # Safety
///
/// See [`KvStr::as_bytes`].
pub(crate) unsafe fn required_str<'a>(view: KvStr, what: &str) -> StoreResult<&'a str> {
    if view.is_null() {
        return Err(StoreError::invalid_argument(format!("null {what}")));
    }
    view.as_str()
        .ok_or_else(|| StoreError::invalid_argument(format!("{what} is not UTF-8")))
}

/// Reads an optional UTF-8 argument; null is `None`.
///
/// # Safety
///
/// See [`KvStr::as_bytes`].
pub(crate) unsafe fn optional_str<'a>(view: KvStr, what: &str) -> StoreResult<Option<&'a str>> {
    if view.is_null() {
        return Ok(None);
    }
    required_str(view, what).map(Some)
}
