//! Store lifecycle and whole-store operations.

use crate::buffer::KvBuffer;
use crate::error::{guard, optional_str, required_str, with_store};
use crate::handles;
use crate::types::{KvHandle, KvMode, KvStr};
use kvbridge_store::{OpenOptions, StoreError};
use std::path::Path;

/// Opens the default store under the directory given to `kv_initialize`.
///
/// `crypt_key` may be null for a plain store. Returns the null handle on
/// failure.
///
/// # Safety
///
/// `crypt_key` must be a valid view or null.
#[no_mangle]
pub unsafe extern "C" fn kv_open_default(mode: i32, crypt_key: KvStr) -> KvHandle {
    guard(KvHandle::NULL, || {
        let store = kvbridge_store::open_default(KvMode::from(mode).into(), crypt_key.as_bytes())?;
        Ok(handles::insert(store))
    })
}

/// Opens a store by identifier.
///
/// # Arguments
///
/// * `id` - Store identifier (required)
/// * `mode` - `KvMode` code
/// * `crypt_key` - Crypt key, null or empty for a plain store
/// * `root` - Root directory, null for the directory given to `kv_initialize`
/// * `expected_capacity` - Initial file size hint in bytes, 0 for one page
///
/// Opening the same identifier under the same root while it is open
/// returns the same handle; the crypt key and capacity are then ignored.
///
/// # Safety
///
/// All views must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn kv_open_with_id(
    id: KvStr,
    mode: i32,
    crypt_key: KvStr,
    root: KvStr,
    expected_capacity: u64,
) -> KvHandle {
    guard(KvHandle::NULL, || {
        let mut options = OpenOptions::new(required_str(id, "id")?)
            .mode(KvMode::from(mode).into())
            .expected_capacity(expected_capacity);
        if let Some(key) = crypt_key.as_bytes() {
            options = options.crypt_key(key);
        }
        if let Some(root) = optional_str(root, "root")? {
            options = options.root_path(root);
        }
        let store = kvbridge_store::open(&options)?;
        Ok(handles::insert(store))
    })
}

/// Closes a store. The handle is invalid afterwards.
#[no_mangle]
pub extern "C" fn kv_close(handle: KvHandle) {
    guard((), || {
        if let Some(store) = handles::remove(handle) {
            kvbridge_store::close(&store);
        }
        Ok(())
    });
}

/// Identifier of an open store, as a buffer to free with `kv_buffer_free`.
#[no_mangle]
pub extern "C" fn kv_mmap_id(handle: KvHandle) -> KvBuffer {
    with_store(handle, KvBuffer::empty(), |store| {
        Ok(KvBuffer::from_vec(store.id().as_bytes().to_vec()))
    })
}

/// Returns true if the store is shared between processes.
#[no_mangle]
pub extern "C" fn kv_is_multi_process(handle: KvHandle) -> bool {
    with_store(handle, false, |store| Ok(store.is_multi_process()))
}

/// Removes every key. With `keep_space` the file keeps its size.
#[no_mangle]
pub extern "C" fn kv_clear_all(handle: KvHandle, keep_space: bool) -> bool {
    with_store(handle, false, |store| {
        store.clear_all(keep_space).map(|()| true)
    })
}

/// Number of keys, leaving out expired ones when `filter_expire` is set.
#[no_mangle]
pub extern "C" fn kv_count(handle: KvHandle, filter_expire: bool) -> u64 {
    with_store(handle, 0, |store| Ok(store.count(filter_expire) as u64))
}

/// Size of the data file.
#[no_mangle]
pub extern "C" fn kv_total_size(handle: KvHandle) -> u64 {
    with_store(handle, 0, |store| Ok(store.total_size() as u64))
}

/// Bytes of the data file used by records.
#[no_mangle]
pub extern "C" fn kv_actual_size(handle: KvHandle) -> u64 {
    with_store(handle, 0, |store| Ok(store.actual_size() as u64))
}

/// Flushes to disk; blocks until done when `sync` is set.
#[no_mangle]
pub extern "C" fn kv_sync(handle: KvHandle, sync: bool) -> bool {
    with_store(handle, false, |store| store.sync(sync).map(|()| true))
}

/// Drops the in-memory index; it is rebuilt on the next access.
#[no_mangle]
pub extern "C" fn kv_clear_memory_cache(handle: KvHandle) {
    with_store(handle, (), |store| {
        store.clear_memory_cache();
        Ok(())
    });
}

/// Compacts the store and shrinks its file.
#[no_mangle]
pub extern "C" fn kv_trim(handle: KvHandle) -> bool {
    with_store(handle, false, |store| store.trim().map(|()| true))
}

/// Turns auto-expiration on; `seconds` is the default duration, 0 = never.
#[no_mangle]
pub extern "C" fn kv_enable_auto_expire(handle: KvHandle, seconds: u32) -> bool {
    with_store(handle, false, |store| {
        store.enable_auto_expire(seconds).map(|()| true)
    })
}

/// Turns auto-expiration off.
#[no_mangle]
pub extern "C" fn kv_disable_auto_expire(handle: KvHandle) -> bool {
    with_store(handle, false, |store| {
        store.disable_auto_expire().map(|()| true)
    })
}

/// Skips writes of values equal to the stored ones. Fails while
/// auto-expiration is on.
#[no_mangle]
pub extern "C" fn kv_enable_compare_before_set(handle: KvHandle) -> bool {
    with_store(handle, false, |store| {
        store.enable_compare_before_set().map(|()| true)
    })
}

/// Writes unconditionally again.
#[no_mangle]
pub extern "C" fn kv_disable_compare_before_set(handle: KvHandle) -> bool {
    with_store(handle, false, |store| {
        store.disable_compare_before_set().map(|()| true)
    })
}

/// Takes the inter-process lock. Always succeeds in single-process mode.
#[no_mangle]
pub extern "C" fn kv_lock(handle: KvHandle) -> bool {
    with_store(handle, false, |store| store.lock().map(|()| true))
}

/// Releases the inter-process lock.
#[no_mangle]
pub extern "C" fn kv_unlock(handle: KvHandle) -> bool {
    with_store(handle, false, |store| store.unlock().map(|()| true))
}

/// Takes the inter-process lock if it is free.
#[no_mangle]
pub extern "C" fn kv_try_lock(handle: KvHandle) -> bool {
    with_store(handle, false, |store| {
        if store.try_lock() {
            Ok(true)
        } else {
            Err(StoreError::Locked)
        }
    })
}

/// Reloads if another process wrote, firing the content change callback.
#[no_mangle]
pub extern "C" fn kv_check_content_changed(handle: KvHandle) -> bool {
    with_store(handle, false, |store| {
        store.check_content_changed().map(|()| true)
    })
}

/// Returns true if the files of a store are intact. Missing files count
/// as intact.
///
/// # Safety
///
/// Views must be valid; `root` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_is_file_valid(id: KvStr, root: KvStr) -> bool {
    guard(false, || {
        let id = required_str(id, "id")?;
        let root = optional_str(root, "root")?;
        Ok(kvbridge_store::is_file_valid(id, root.map(Path::new)))
    })
}
