//! Buffer types for FFI.
//!
//! Every buffer handed out is counted until it is freed, so callers can
//! check that repeated reads leave nothing behind.

use std::sync::atomic::{AtomicUsize, Ordering};

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

/// A byte buffer for FFI.
///
/// Memory is owned by the native side. Call `kv_buffer_free` exactly once
/// to release it. A null buffer is the empty result and needs no release.
#[repr(C)]
#[derive(Debug)]
pub struct KvBuffer {
    /// Pointer to data.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl KvBuffer {
    /// Creates a new buffer from a Vec.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let mut vec = vec.into_boxed_slice();
        let data = vec.as_mut_ptr();
        let len = vec.len();
        std::mem::forget(vec);
        OUTSTANDING.fetch_add(1, Ordering::Relaxed);

        Self {
            data,
            len,
            capacity: len,
        }
    }

    /// Creates the null buffer.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Returns true if the buffer is null.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Views the contents without releasing them.
    ///
    /// # Safety
    ///
    /// The buffer must come from this crate and not have been freed.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.data.is_null() || self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.data, self.len)
    }

    /// Converts back to a Vec, consuming the buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created by [`from_vec`](Self::from_vec)
    /// and not freed.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        OUTSTANDING.fetch_sub(1, Ordering::Relaxed);
        Vec::from_raw_parts(self.data, self.len, self.capacity)
    }
}

/// Moves buffers into a native array. Returns null for an empty list.
pub(crate) fn array_from_vec(buffers: Vec<KvBuffer>) -> (*mut KvBuffer, usize) {
    if buffers.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let mut array = buffers.into_boxed_slice();
    let ptr = array.as_mut_ptr();
    let count = array.len();
    std::mem::forget(array);
    OUTSTANDING.fetch_add(1, Ordering::Relaxed);
    (ptr, count)
}

/// Frees a buffer allocated by kvbridge.
///
/// # Safety
///
/// The buffer must have been allocated by kvbridge FFI functions and not
/// freed before.
#[no_mangle]
pub unsafe extern "C" fn kv_buffer_free(buffer: KvBuffer) {
    drop(buffer.into_vec());
}

/// Frees an array returned by `kv_all_keys`.
///
/// Only the array is released; its elements are freed one by one with
/// `kv_buffer_free` before this call.
///
/// # Safety
///
/// `array` and `count` must be exactly what `kv_all_keys` returned.
#[no_mangle]
pub unsafe extern "C" fn kv_buffer_array_free(array: *mut KvBuffer, count: usize) {
    if array.is_null() {
        return;
    }
    OUTSTANDING.fetch_sub(1, Ordering::Relaxed);
    drop(Vec::from_raw_parts(array, count, count));
}

/// Number of native buffers and arrays handed out and not yet freed.
#[no_mangle]
pub extern "C" fn kv_outstanding_buffers() -> usize {
    OUTSTANDING.load(Ordering::Relaxed)
}
