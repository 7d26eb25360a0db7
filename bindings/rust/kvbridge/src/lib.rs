//! # kvbridge
//!
//! Safe Rust bindings over the kvbridge C ABI.
//!
//! Strings and keys go to the native side as borrowed views, without
//! copying. Values come back either copied (`get_string`, `get_bytes`) or
//! as an [`OwnedBuffer`] that reads the native memory in place and frees
//! it when dropped.
//!
//! ## Example
//!
//! ```rust,ignore
//! kvbridge::initialize("/tmp/kv", kvbridge::LogLevel::Info)?;
//! let kv = kvbridge::open(&kvbridge::OpenOptions::new("demo"))?;
//! kv.set("bool", true);
//! assert!(kv.get::<bool>("bool"));
//! kv.remove("bool");
//! assert!(!kv.contains("bool"));
//! ```

#![warn(missing_docs)]

mod batch;
mod buffer;
mod callback;
mod config;
mod error;
mod kv;
mod view;

pub use buffer::OwnedBuffer;
pub use callback::{
    register_content_change_handler, register_error_handler, register_log_handler,
    unregister_content_change_handler, unregister_error_handler, unregister_log_handler,
    LogMessage,
};
pub use config::{ErrorType, LogLevel, Mode, OpenOptions, RecoverStrategy};
pub use error::{last_error, Error, Result};
pub use kv::{Kv, Primitive};
pub use view::BorrowedView;

use kvbridge_ffi as ffi;
use kvbridge_ffi::{KvLogLevel, KvMode};
use std::ffi::CStr;
use std::path::Path;

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
}

fn optional_path(path: Option<&Path>) -> Result<BorrowedView<'_>> {
    Ok(match path {
        Some(path) => BorrowedView::from_str(path_str(path)?),
        None => BorrowedView::absent(),
    })
}

fn level_code(level: LogLevel) -> i32 {
    KvLogLevel::from(level) as i32
}

fn mode_code(mode: Mode) -> i32 {
    KvMode::from(mode) as i32
}

/// Sets the default root directory and the minimum log level.
pub fn initialize(root: impl AsRef<Path>, level: LogLevel) -> Result<()> {
    let root = path_str(root.as_ref())?;
    // SAFETY: the root view outlives the call.
    let ok = unsafe { ffi::kv_initialize(BorrowedView::from_str(root).raw(), level_code(level), None) };
    ok.then_some(()).ok_or_else(|| Error::native("initialize"))
}

/// Like [`initialize`], with a log handler in place before the first
/// record is written.
pub fn initialize_with_log_handler(
    root: impl AsRef<Path>,
    level: LogLevel,
    handler: impl Fn(&LogMessage) + Send + Sync + 'static,
) -> Result<()> {
    let root = path_str(root.as_ref())?;
    let callback = callback::install_log_handler(handler);
    // SAFETY: the root view outlives the call.
    let ok = unsafe {
        ffi::kv_initialize(
            BorrowedView::from_str(root).raw(),
            level_code(level),
            Some(callback),
        )
    };
    ok.then_some(()).ok_or_else(|| Error::native("initialize"))
}

/// Closes every store. Handles obtained earlier become stale.
pub fn on_exit() {
    ffi::kv_on_exit();
}

/// Page size data files are rounded to.
pub fn page_size() -> i32 {
    ffi::kv_page_size()
}

/// Native library version.
pub fn version() -> &'static str {
    // SAFETY: kv_version returns a static NUL-terminated string.
    let version = unsafe { CStr::from_ptr(ffi::kv_version()) };
    version.to_str().unwrap_or_default()
}

/// Opens the default single-process store.
pub fn default_kv() -> Result<Kv> {
    default_kv_with(Mode::SingleProcess, None)
}

/// Opens the default store with a mode and optional crypt key.
pub fn default_kv_with(mode: Mode, crypt_key: Option<&[u8]>) -> Result<Kv> {
    // SAFETY: the key view outlives the call.
    let handle =
        unsafe { ffi::kv_open_default(mode_code(mode), BorrowedView::optional(crypt_key).raw()) };
    Kv::from_handle(handle).ok_or_else(|| Error::native("open default store"))
}

/// Opens a store. Opening one that is already open returns the same store.
pub fn open(options: &OpenOptions) -> Result<Kv> {
    let root = optional_path(options.root.as_deref())?;
    // SAFETY: every view outlives the call.
    let handle = unsafe {
        ffi::kv_open_with_id(
            BorrowedView::from_str(&options.id).raw(),
            mode_code(options.mode),
            BorrowedView::optional(options.crypt_key.as_deref()).raw(),
            root.raw(),
            options.expected_capacity,
        )
    };
    Kv::from_handle(handle).ok_or_else(|| Error::native("open"))
}

/// Copies one store from `src_root` (default root for `None`) into `dst_dir`.
pub fn backup_one(id: &str, dst_dir: impl AsRef<Path>, src_root: Option<&Path>) -> Result<()> {
    let dst = path_str(dst_dir.as_ref())?;
    let root = optional_path(src_root)?;
    // SAFETY: every view outlives the call.
    let ok = unsafe {
        ffi::kv_backup_one_to_directory(
            BorrowedView::from_str(id).raw(),
            BorrowedView::from_str(dst).raw(),
            root.raw(),
        )
    };
    ok.then_some(()).ok_or_else(|| Error::native("backup"))
}

/// Restores one store from `src_dir` into `dst_root` (default root for
/// `None`). An open store is reloaded in place.
pub fn restore_one(id: &str, src_dir: impl AsRef<Path>, dst_root: Option<&Path>) -> Result<()> {
    let src = path_str(src_dir.as_ref())?;
    let root = optional_path(dst_root)?;
    // SAFETY: every view outlives the call.
    let ok = unsafe {
        ffi::kv_restore_one_from_directory(
            BorrowedView::from_str(id).raw(),
            BorrowedView::from_str(src).raw(),
            root.raw(),
        )
    };
    ok.then_some(()).ok_or_else(|| Error::native("restore"))
}

/// Copies every store under `src_root` into `dst_dir`. Returns the count.
pub fn backup_all(dst_dir: impl AsRef<Path>, src_root: Option<&Path>) -> Result<u64> {
    let dst = path_str(dst_dir.as_ref())?;
    let root = optional_path(src_root)?;
    // SAFETY: every view outlives the call.
    Ok(unsafe { ffi::kv_backup_all_to_directory(BorrowedView::from_str(dst).raw(), root.raw()) })
}

/// Restores every store in `src_dir` into `dst_root`. Returns the count.
pub fn restore_all(src_dir: impl AsRef<Path>, dst_root: Option<&Path>) -> Result<u64> {
    let src = path_str(src_dir.as_ref())?;
    let root = optional_path(dst_root)?;
    // SAFETY: every view outlives the call.
    Ok(unsafe { ffi::kv_restore_all_from_directory(BorrowedView::from_str(src).raw(), root.raw()) })
}

/// Closes a store if open and deletes its files.
pub fn remove_storage(id: &str, root: Option<&Path>) -> Result<()> {
    let root = optional_path(root)?;
    // SAFETY: every view outlives the call.
    let ok = unsafe { ffi::kv_remove_storage(BorrowedView::from_str(id).raw(), root.raw()) };
    ok.then_some(()).ok_or_else(|| Error::native("remove storage"))
}

/// Returns true if a store's files are intact or absent.
pub fn is_file_valid(id: &str, root: Option<&Path>) -> bool {
    let Ok(root) = optional_path(root) else {
        return false;
    };
    // SAFETY: every view outlives the call.
    unsafe { ffi::kv_is_file_valid(BorrowedView::from_str(id).raw(), root.raw()) }
}
