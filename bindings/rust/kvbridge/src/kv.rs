//! The store handle.

use crate::batch;
use crate::buffer::OwnedBuffer;
use crate::view::BorrowedView;
use kvbridge_ffi as ffi;
use kvbridge_ffi::KvHandle;

/// Scalar types the store holds natively.
pub trait Primitive: Copy + Default + sealed::Sealed {
    #[doc(hidden)]
    fn set(handle: KvHandle, key: BorrowedView<'_>, value: Self, expire: Option<u32>) -> bool;
    #[doc(hidden)]
    fn get(handle: KvHandle, key: BorrowedView<'_>, default: Self) -> Self;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! primitive {
    ($($ty:ty => $set:ident, $set_expire:ident, $get:ident;)*) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            fn set(handle: KvHandle, key: BorrowedView<'_>, value: Self, expire: Option<u32>) -> bool {
                // SAFETY: the key view outlives the call.
                unsafe {
                    match expire {
                        Some(seconds) => ffi::$set_expire(handle, key.raw(), value, seconds),
                        None => ffi::$set(handle, key.raw(), value),
                    }
                }
            }

            fn get(handle: KvHandle, key: BorrowedView<'_>, default: Self) -> Self {
                // SAFETY: the key view outlives the call.
                unsafe { ffi::$get(handle, key.raw(), default) }
            }
        }
    )*};
}

primitive! {
    bool => kv_set_bool, kv_set_bool_expire, kv_get_bool;
    i32 => kv_set_i32, kv_set_i32_expire, kv_get_i32;
    u32 => kv_set_u32, kv_set_u32_expire, kv_get_u32;
    i64 => kv_set_i64, kv_set_i64_expire, kv_get_i64;
    u64 => kv_set_u64, kv_set_u64_expire, kv_get_u64;
    f32 => kv_set_f32, kv_set_f32_expire, kv_get_f32;
    f64 => kv_set_f64, kv_set_f64_expire, kv_get_f64;
}

/// An open store.
///
/// A cheap handle: copies refer to the same store. After [`close`](Self::close)
/// every copy is stale and calls on it return defaults.
///
/// Calls that cannot produce their result return `false`, `0`, `None` or
/// the given default; [`last_error`](crate::last_error) tells why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kv {
    handle: KvHandle,
}

impl Kv {
    pub(crate) fn from_handle(handle: KvHandle) -> Option<Self> {
        (!handle.is_null()).then_some(Self { handle })
    }

    /// The native handle.
    pub fn handle(&self) -> KvHandle {
        self.handle
    }

    /// Stores a scalar with the store's default expiration.
    pub fn set<T: Primitive>(&self, key: &str, value: T) -> bool {
        T::set(self.handle, key.into(), value, None)
    }

    /// Stores a scalar that expires after `seconds`, 0 meaning never.
    pub fn set_with_expire<T: Primitive>(&self, key: &str, value: T, seconds: u32) -> bool {
        T::set(self.handle, key.into(), value, Some(seconds))
    }

    /// Reads a scalar, or `T::default()` if absent or of another type.
    pub fn get<T: Primitive>(&self, key: &str) -> T {
        self.get_or(key, T::default())
    }

    /// Reads a scalar, or `default` if absent or of another type.
    pub fn get_or<T: Primitive>(&self, key: &str, default: T) -> T {
        T::get(self.handle, key.into(), default)
    }

    /// Stores text.
    pub fn set_string(&self, key: &str, value: &str) -> bool {
        self.set_bytes(key, value.as_bytes())
    }

    /// Stores text that expires after `seconds`.
    pub fn set_string_with_expire(&self, key: &str, value: &str, seconds: u32) -> bool {
        self.set_bytes_with_expire(key, value.as_bytes(), seconds)
    }

    /// Stores bytes.
    pub fn set_bytes(&self, key: &str, value: &[u8]) -> bool {
        // SAFETY: both views outlive the call.
        unsafe {
            ffi::kv_set_bytes(
                self.handle,
                BorrowedView::from_str(key).raw(),
                BorrowedView::new(value).raw(),
            )
        }
    }

    /// Stores bytes that expire after `seconds`.
    pub fn set_bytes_with_expire(&self, key: &str, value: &[u8], seconds: u32) -> bool {
        // SAFETY: both views outlive the call.
        unsafe {
            ffi::kv_set_bytes_expire(
                self.handle,
                BorrowedView::from_str(key).raw(),
                BorrowedView::new(value).raw(),
                seconds,
            )
        }
    }

    /// Reads text into an owned `String`. Invalid UTF-8 gives `None`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let buffer = self.get_bytes_buffer(key)?;
        buffer.as_str().ok().map(str::to_owned)
    }

    /// Reads bytes into an owned `Vec`.
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.get_bytes_buffer(key).map(|buffer| buffer.to_vec())
    }

    /// Reads bytes without copying them out of the native buffer.
    pub fn get_bytes_buffer(&self, key: &str) -> Option<OwnedBuffer> {
        // SAFETY: the key view outlives the call; the buffer is adopted once.
        unsafe {
            let raw = ffi::kv_get_bytes(self.handle, BorrowedView::from_str(key).raw());
            OwnedBuffer::from_raw(raw)
        }
    }

    /// Reads text without copying; `None` if absent or not UTF-8.
    pub fn get_string_buffer(&self, key: &str) -> Option<OwnedBuffer> {
        self.get_bytes_buffer(key)
            .filter(|buffer| buffer.as_str().is_ok())
    }

    /// Size of a value's payload, or of its whole stored encoding when
    /// `actual` is false. 0 if absent.
    pub fn value_size(&self, key: &str, actual: bool) -> usize {
        // SAFETY: the key view outlives the call.
        unsafe { ffi::kv_value_size(self.handle, BorrowedView::from_str(key).raw(), actual) }
    }

    /// Returns true if `key` holds a live value.
    pub fn contains(&self, key: &str) -> bool {
        // SAFETY: the key view outlives the call.
        unsafe { ffi::kv_contains_key(self.handle, BorrowedView::from_str(key).raw()) }
    }

    /// Removes one key.
    pub fn remove(&self, key: &str) -> bool {
        // SAFETY: the key view outlives the call.
        unsafe { ffi::kv_remove_key(self.handle, BorrowedView::from_str(key).raw()) }
    }

    /// Removes many keys with one native call. Returns how many were
    /// present.
    pub fn remove_keys<S: AsRef<str>>(&self, keys: &[S]) -> u64 {
        batch::remove_keys(self.handle, keys)
    }

    /// All keys, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        batch::all_keys(self.handle, false)
    }

    /// All keys that have not expired, sorted.
    pub fn all_non_expired_keys(&self) -> Vec<String> {
        batch::all_keys(self.handle, true)
    }

    /// Number of keys.
    pub fn count(&self) -> u64 {
        ffi::kv_count(self.handle, false)
    }

    /// Number of keys that have not expired.
    pub fn count_non_expired(&self) -> u64 {
        ffi::kv_count(self.handle, true)
    }

    /// Removes every key and shrinks the file.
    pub fn clear_all(&self) -> bool {
        ffi::kv_clear_all(self.handle, false)
    }

    /// Removes every key, keeping the file size.
    pub fn clear_all_keep_space(&self) -> bool {
        ffi::kv_clear_all(self.handle, true)
    }

    /// Size of the data file.
    pub fn total_size(&self) -> u64 {
        ffi::kv_total_size(self.handle)
    }

    /// Bytes of the data file in use.
    pub fn actual_size(&self) -> u64 {
        ffi::kv_actual_size(self.handle)
    }

    /// Flushes to disk, waiting for completion.
    pub fn sync(&self) -> bool {
        ffi::kv_sync(self.handle, true)
    }

    /// Starts a flush to disk without waiting.
    pub fn async_sync(&self) -> bool {
        ffi::kv_sync(self.handle, false)
    }

    /// Drops the in-memory index; it is rebuilt on next access.
    pub fn clear_memory_cache(&self) {
        ffi::kv_clear_memory_cache(self.handle);
    }

    /// Compacts the store and shrinks its file.
    pub fn trim(&self) -> bool {
        ffi::kv_trim(self.handle)
    }

    /// Closes the store. Every copy of this handle becomes stale.
    pub fn close(self) {
        ffi::kv_close(self.handle);
    }

    /// The store identifier.
    pub fn mmap_id(&self) -> String {
        // SAFETY: the buffer is adopted once.
        unsafe { OwnedBuffer::from_raw(ffi::kv_mmap_id(self.handle)) }
            .map(|buffer| buffer.to_string_lossy())
            .unwrap_or_default()
    }

    /// Returns true if the store is shared between processes.
    pub fn is_multi_process(&self) -> bool {
        ffi::kv_is_multi_process(self.handle)
    }

    /// Changes the crypt key, `None` removing encryption.
    pub fn rekey(&self, key: Option<&[u8]>) -> bool {
        // SAFETY: the key view outlives the call.
        unsafe { ffi::kv_rekey(self.handle, BorrowedView::optional(key).raw()) }
    }

    /// Adopts a crypt key another process installed.
    pub fn check_reset_crypt_key(&self, key: Option<&[u8]>) -> bool {
        // SAFETY: the key view outlives the call.
        unsafe { ffi::kv_check_reset_crypt_key(self.handle, BorrowedView::optional(key).raw()) }
    }

    /// The crypt key, `None` for a plain store.
    pub fn crypt_key(&self) -> Option<Vec<u8>> {
        // SAFETY: the buffer is adopted once.
        unsafe { OwnedBuffer::from_raw(ffi::kv_crypt_key(self.handle)) }.map(|b| b.to_vec())
    }

    /// Turns on auto-expiration with a default duration, 0 meaning never.
    pub fn enable_auto_expire(&self, default_seconds: u32) -> bool {
        ffi::kv_enable_auto_expire(self.handle, default_seconds)
    }

    /// Turns off auto-expiration.
    pub fn disable_auto_expire(&self) -> bool {
        ffi::kv_disable_auto_expire(self.handle)
    }

    /// Skips writes of unchanged values. Fails while auto-expiration is on.
    pub fn enable_compare_before_set(&self) -> bool {
        ffi::kv_enable_compare_before_set(self.handle)
    }

    /// Writes unconditionally again.
    pub fn disable_compare_before_set(&self) -> bool {
        ffi::kv_disable_compare_before_set(self.handle)
    }

    /// Takes the inter-process lock.
    pub fn lock(&self) -> bool {
        ffi::kv_lock(self.handle)
    }

    /// Releases the inter-process lock.
    pub fn unlock(&self) -> bool {
        ffi::kv_unlock(self.handle)
    }

    /// Takes the inter-process lock if it is free.
    pub fn try_lock(&self) -> bool {
        ffi::kv_try_lock(self.handle)
    }

    /// Picks up changes made by other processes.
    pub fn check_content_changed(&self) -> bool {
        ffi::kv_check_content_changed(self.handle)
    }
}
