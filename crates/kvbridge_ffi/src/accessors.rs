//! Typed value accessors.
//!
//! Getters take the caller's fallback and return it when the key is
//! absent, expired, or holds another type.

use crate::buffer::KvBuffer;
use crate::error::{required_str, with_store};
use crate::types::{KvHandle, KvStr};

macro_rules! scalar_accessors {
    ($($ty:ty => $set:ident, $set_expire:ident, $get:ident;)*) => {$(
        #[doc = concat!("Stores a `", stringify!($ty), "` with the store's default expiration.")]
        ///
        /// # Safety
        ///
        /// `key` must be a valid view.
        #[no_mangle]
        pub unsafe extern "C" fn $set(handle: KvHandle, key: KvStr, value: $ty) -> bool {
            with_store(handle, false, |store| {
                store.set(required_str(key, "key")?, value, None).map(|()| true)
            })
        }

        #[doc = concat!("Stores a `", stringify!($ty), "` that expires after `seconds`, 0 = never.")]
        ///
        /// # Safety
        ///
        /// `key` must be a valid view.
        #[no_mangle]
        pub unsafe extern "C" fn $set_expire(
            handle: KvHandle,
            key: KvStr,
            value: $ty,
            seconds: u32,
        ) -> bool {
            with_store(handle, false, |store| {
                store
                    .set(required_str(key, "key")?, value, Some(seconds))
                    .map(|()| true)
            })
        }

        #[doc = concat!("Reads a `", stringify!($ty), "`, or `default`.")]
        ///
        /// # Safety
        ///
        /// `key` must be a valid view.
        #[no_mangle]
        pub unsafe extern "C" fn $get(handle: KvHandle, key: KvStr, default: $ty) -> $ty {
            with_store(handle, default, |store| {
                Ok(store.get::<$ty>(required_str(key, "key")?)?.unwrap_or(default))
            })
        }
    )*};
}

scalar_accessors! {
    bool => kv_set_bool, kv_set_bool_expire, kv_get_bool;
    i32 => kv_set_i32, kv_set_i32_expire, kv_get_i32;
    u32 => kv_set_u32, kv_set_u32_expire, kv_get_u32;
    i64 => kv_set_i64, kv_set_i64_expire, kv_get_i64;
    u64 => kv_set_u64, kv_set_u64_expire, kv_get_u64;
    f32 => kv_set_f32, kv_set_f32_expire, kv_get_f32;
    f64 => kv_set_f64, kv_set_f64_expire, kv_get_f64;
}

/// Stores bytes or UTF-8 text. A null `value` removes the key.
///
/// # Safety
///
/// `key` and `value` must be valid views; `value` may be null.
#[no_mangle]
pub unsafe extern "C" fn kv_set_bytes(handle: KvHandle, key: KvStr, value: KvStr) -> bool {
    set_bytes(handle, key, value, None)
}

/// Stores bytes that expire after `seconds`, 0 = never.
///
/// # Safety
///
/// Same as `kv_set_bytes`.
#[no_mangle]
pub unsafe extern "C" fn kv_set_bytes_expire(
    handle: KvHandle,
    key: KvStr,
    value: KvStr,
    seconds: u32,
) -> bool {
    set_bytes(handle, key, value, Some(seconds))
}

unsafe fn set_bytes(handle: KvHandle, key: KvStr, value: KvStr, expire: Option<u32>) -> bool {
    with_store(handle, false, |store| {
        let key = required_str(key, "key")?;
        match value.as_bytes() {
            Some(bytes) => store.set_bytes(key, bytes, expire)?,
            None => store.remove(key)?,
        }
        Ok(true)
    })
}

/// Reads bytes or text into a buffer to free with `kv_buffer_free`.
///
/// Returns the null buffer if the key is absent or holds a scalar.
///
/// # Safety
///
/// `key` must be a valid view.
#[no_mangle]
pub unsafe extern "C" fn kv_get_bytes(handle: KvHandle, key: KvStr) -> KvBuffer {
    with_store(handle, KvBuffer::empty(), |store| {
        Ok(match store.get_bytes(required_str(key, "key")?)? {
            Some(bytes) => KvBuffer::from_vec(bytes),
            None => KvBuffer::empty(),
        })
    })
}

/// Size of a stored value: the payload alone when `actual` is set,
/// otherwise its stored encoding. 0 if absent.
///
/// # Safety
///
/// `key` must be a valid view.
#[no_mangle]
pub unsafe extern "C" fn kv_value_size(handle: KvHandle, key: KvStr, actual: bool) -> usize {
    with_store(handle, 0, |store| {
        store.value_size(required_str(key, "key")?, actual)
    })
}

/// Returns true if the key holds a live value.
///
/// # Safety
///
/// `key` must be a valid view.
#[no_mangle]
pub unsafe extern "C" fn kv_contains_key(handle: KvHandle, key: KvStr) -> bool {
    with_store(handle, false, |store| {
        Ok(store.contains(required_str(key, "key")?))
    })
}

/// Removes one key. Removing an absent key succeeds.
///
/// # Safety
///
/// `key` must be a valid view.
#[no_mangle]
pub unsafe extern "C" fn kv_remove_key(handle: KvHandle, key: KvStr) -> bool {
    with_store(handle, false, |store| {
        store.remove(required_str(key, "key")?).map(|()| true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::kv_buffer_free;
    use crate::store::{kv_close, kv_open_with_id};
    use tempfile::tempdir;

    fn key(s: &str) -> KvStr {
        KvStr::from_str(s)
    }

    #[test]
    fn scalars_and_fallbacks() {
        let dir = tempdir().unwrap();
        unsafe {
            let h = kv_open_with_id(
                key("scalars"),
                1,
                KvStr::null(),
                key(dir.path().to_str().unwrap()),
                0,
            );
            assert!(kv_set_i32(h, key("i"), -5));
            assert!(kv_set_f64(h, key("f"), 2.5));
            assert!(kv_set_bool(h, key("b"), true));
            assert_eq!(kv_get_i32(h, key("i"), 0), -5);
            assert_eq!(kv_get_f64(h, key("f"), 0.0), 2.5);
            assert!(kv_get_bool(h, key("b"), false));

            assert_eq!(kv_get_u64(h, key("missing"), 77), 77);
            // Stored as i32, asked as u64.
            assert_eq!(kv_get_u64(h, key("i"), 9), 9);
            assert!(!kv_set_i32(h, KvStr::null(), 1));
            kv_close(h);
        }
    }

    #[test]
    fn bytes_and_null_value() {
        let dir = tempdir().unwrap();
        unsafe {
            let h = kv_open_with_id(
                key("bytes"),
                1,
                KvStr::null(),
                key(dir.path().to_str().unwrap()),
                0,
            );
            assert!(kv_set_bytes(h, key("s"), key("hello")));
            let buf = kv_get_bytes(h, key("s"));
            assert_eq!(buf.as_slice(), b"hello");
            kv_buffer_free(buf);
            assert_eq!(kv_value_size(h, key("s"), true), 5);
            assert!(kv_value_size(h, key("s"), false) > 5);

            assert!(kv_set_bytes(h, key("empty"), key("")));
            let buf = kv_get_bytes(h, key("empty"));
            assert!(!buf.is_null());
            assert_eq!(buf.len, 0);
            kv_buffer_free(buf);

            assert!(kv_set_bytes(h, key("s"), KvStr::null()));
            assert!(!kv_contains_key(h, key("s")));
            assert!(kv_get_bytes(h, key("s")).is_null());
            kv_close(h);
        }
    }
}
