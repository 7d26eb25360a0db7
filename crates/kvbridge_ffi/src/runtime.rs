//! Process-wide setup and queries.

use crate::callback::{kv_set_log_callback, KvLogCallback};
use crate::error::{guard, required_str};
use crate::handles;
use crate::types::{KvLogLevel, KvStr};
use kvbridge_store::DEFAULT_MMAP_SIZE;
use std::ffi::c_char;

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Sets the default root directory and minimum log level.
///
/// A non-null `log_callback` is registered before anything is logged.
///
/// # Safety
///
/// `root` must be a valid view.
#[no_mangle]
pub unsafe extern "C" fn kv_initialize(
    root: KvStr,
    log_level: i32,
    log_callback: Option<KvLogCallback>,
) -> bool {
    guard(false, || {
        let root = required_str(root, "root")?;
        if log_callback.is_some() {
            kv_set_log_callback(log_callback);
        }
        kvbridge_store::initialize(root, KvLogLevel::from(log_level).into())?;
        Ok(true)
    })
}

/// Closes every store and invalidates every handle.
#[no_mangle]
pub extern "C" fn kv_on_exit() {
    guard((), || {
        handles::clear();
        kvbridge_store::on_exit();
        Ok(())
    });
}

/// Page size all data files are rounded to.
#[no_mangle]
pub extern "C" fn kv_page_size() -> i32 {
    DEFAULT_MMAP_SIZE as i32
}

/// Library version as a static NUL-terminated string. Never free it.
#[no_mangle]
pub extern "C" fn kv_version() -> *const c_char {
    VERSION.as_ptr().cast()
}
