//! Marshaling of key lists in both directions.

use crate::buffer::OwnedBuffer;
use crate::view::BorrowedView;
use kvbridge_ffi::{kv_all_keys, kv_buffer_array_free, kv_remove_keys, KvBuffer, KvHandle, KvStr};
use std::marker::PhantomData;

/// Views of many keys laid out as one native array.
///
/// The array is owned here for the length of one call; the keys are
/// borrowed, not copied.
pub(crate) struct ViewArray<'a> {
    views: Vec<KvStr>,
    _borrow: PhantomData<&'a str>,
}

impl<'a> ViewArray<'a> {
    pub(crate) fn new<S: AsRef<str>>(keys: &'a [S]) -> Self {
        Self {
            views: keys
                .iter()
                .map(|key| BorrowedView::from_str(key.as_ref()).raw())
                .collect(),
            _borrow: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const KvStr {
        self.views.as_ptr()
    }

    pub(crate) fn len(&self) -> usize {
        self.views.len()
    }
}

/// Removes `keys` with one native call.
pub(crate) fn remove_keys<S: AsRef<str>>(handle: KvHandle, keys: &[S]) -> u64 {
    if keys.is_empty() {
        return 0;
    }
    let array = ViewArray::new(keys);
    // SAFETY: the array and the keys it views outlive the call.
    unsafe { kv_remove_keys(handle, array.as_ptr(), array.len()) }
}

/// Copies every key out of the native array and releases it.
pub(crate) fn all_keys(handle: KvHandle, filter_expire: bool) -> Vec<String> {
    let mut count = 0usize;
    // SAFETY: count is a valid out-parameter.
    let array = unsafe { kv_all_keys(handle, &mut count, filter_expire) };
    // SAFETY: array and count come straight from kv_all_keys.
    unsafe { take_array(array, count) }
}

/// Copies each element, then frees each element and the array.
///
/// # Safety
///
/// `array` and `count` must come from one native array-returning call.
unsafe fn take_array(array: *mut KvBuffer, count: usize) -> Vec<String> {
    if array.is_null() || count == 0 {
        return Vec::new();
    }
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let element = std::ptr::read(array.add(i));
        if let Some(buffer) = OwnedBuffer::from_raw(element) {
            keys.push(buffer.to_string_lossy());
        }
    }
    kv_buffer_array_free(array, count);
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_views_keys_in_order() {
        let keys = vec!["a".to_string(), "bb".to_string(), String::new()];
        let array = ViewArray::new(&keys);
        assert_eq!(array.len(), 3);
        let views = unsafe { std::slice::from_raw_parts(array.as_ptr(), array.len()) };
        assert_eq!(views[1].ptr, keys[1].as_ptr());
        assert_eq!(views[2].len, 0);
        assert!(!views[2].is_null());
    }

    #[test]
    fn null_array_is_empty() {
        assert!(unsafe { take_array(std::ptr::null_mut(), 4) }.is_empty());
        assert_eq!(remove_keys::<&str>(KvHandle::NULL, &[]), 0);
        assert!(all_keys(KvHandle::NULL, false).is_empty());
    }
}
