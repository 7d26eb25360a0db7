//! Crypt key management.

use crate::buffer::KvBuffer;
use crate::error::with_store;
use crate::types::{KvHandle, KvStr};

/// Changes the crypt key and rewrites the store. A null or empty key
/// removes encryption.
///
/// # Safety
///
/// `key` must be a valid view or null.
#[no_mangle]
pub unsafe extern "C" fn kv_rekey(handle: KvHandle, key: KvStr) -> bool {
    with_store(handle, false, |store| {
        store.rekey(key.as_bytes()).map(|()| true)
    })
}

/// Adopts a key another process already installed. Nothing is rewritten.
///
/// # Safety
///
/// `key` must be a valid view or null.
#[no_mangle]
pub unsafe extern "C" fn kv_check_reset_crypt_key(handle: KvHandle, key: KvStr) -> bool {
    with_store(handle, false, |store| {
        store.check_reset_crypt_key(key.as_bytes()).map(|()| true)
    })
}

/// The current crypt key, or the null buffer for a plain store.
#[no_mangle]
pub extern "C" fn kv_crypt_key(handle: KvHandle) -> KvBuffer {
    with_store(handle, KvBuffer::empty(), |store| {
        Ok(store
            .crypt_key()
            .map_or_else(KvBuffer::empty, KvBuffer::from_vec))
    })
}

#[cfg(all(test, feature = "encryption"))]
mod tests {
    use super::*;
    use crate::accessors::{kv_get_bytes, kv_set_bytes};
    use crate::buffer::kv_buffer_free;
    use crate::store::{kv_close, kv_open_with_id};
    use tempfile::tempdir;

    #[test]
    fn rekey_round_trip() {
        let dir = tempdir().unwrap();
        let root = KvStr::from_str(dir.path().to_str().unwrap());
        unsafe {
            let h = kv_open_with_id(KvStr::from_str("secret"), 1, KvStr::null(), root, 0);
            assert!(kv_crypt_key(h).is_null());
            assert!(kv_set_bytes(h, KvStr::from_str("k"), KvStr::from_str("v")));

            assert!(kv_rekey(h, KvStr::from_str("key1")));
            let key = kv_crypt_key(h);
            assert_eq!(key.as_slice(), b"key1");
            kv_buffer_free(key);

            let value = kv_get_bytes(h, KvStr::from_str("k"));
            assert_eq!(value.as_slice(), b"v");
            kv_buffer_free(value);

            assert!(kv_rekey(h, KvStr::from_str("")));
            assert!(kv_crypt_key(h).is_null());
            kv_close(h);
        }
    }
}
