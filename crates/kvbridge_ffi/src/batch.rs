//! Batch operations over arrays of keys.

use crate::buffer::{array_from_vec, KvBuffer};
use crate::error::with_store;
use crate::types::{KvHandle, KvStr};

/// Removes many keys in one call.
///
/// Null, empty and non-UTF-8 entries are skipped. Returns how many of the
/// keys were present.
///
/// # Safety
///
/// `keys` must point to `count` valid views, or be null with any count.
#[no_mangle]
pub unsafe extern "C" fn kv_remove_keys(handle: KvHandle, keys: *const KvStr, count: usize) -> u64 {
    with_store(handle, 0, |store| {
        if keys.is_null() || count == 0 {
            return Ok(0);
        }
        let views = std::slice::from_raw_parts(keys, count);
        let keys: Vec<&str> = views.iter().filter_map(|view| view.as_str()).collect();
        store.remove_keys(&keys).map(|removed| removed as u64)
    })
}

/// Lists every key.
///
/// Writes the number of keys to `out_count` and returns an array of that
/// many buffers, or null when there are none. Free each element with
/// `kv_buffer_free`, then the array with `kv_buffer_array_free`.
///
/// # Safety
///
/// `out_count` must be writable or null.
#[no_mangle]
pub unsafe extern "C" fn kv_all_keys(
    handle: KvHandle,
    out_count: *mut usize,
    filter_expire: bool,
) -> *mut KvBuffer {
    let (array, count) = with_store(handle, (std::ptr::null_mut(), 0), |store| {
        let buffers = store
            .all_keys(filter_expire)
            .into_iter()
            .map(|key| KvBuffer::from_vec(key.into_bytes()))
            .collect();
        Ok(array_from_vec(buffers))
    });
    if !out_count.is_null() {
        *out_count = count;
    }
    array
}
