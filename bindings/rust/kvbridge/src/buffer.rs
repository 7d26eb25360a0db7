//! Native buffers owned on the Rust side.

use kvbridge_ffi::{kv_buffer_free, KvBuffer};
use std::fmt;
use std::str::Utf8Error;

/// A buffer allocated by the native side.
///
/// Released exactly once: when dropped, through [`release`](Self::release),
/// or by whoever takes it with [`into_raw`](Self::into_raw). The borrowed
/// views it hands out cannot outlive it.
pub struct OwnedBuffer {
    raw: KvBuffer,
}

// The buffer is plain heap memory owned by this value alone.
unsafe impl Send for OwnedBuffer {}
unsafe impl Sync for OwnedBuffer {}

impl OwnedBuffer {
    /// Takes ownership of a native buffer. Returns `None` for the null
    /// buffer, which needs no release.
    ///
    /// # Safety
    ///
    /// `raw` must come from the kvbridge C ABI and not have been freed or
    /// adopted before.
    pub unsafe fn from_raw(raw: KvBuffer) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        Some(Self { raw })
    }

    /// The bytes, without copying.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the buffer is live until self is dropped.
        unsafe { self.raw.as_slice() }
    }

    /// The bytes as UTF-8 text, without copying.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    /// Copies the bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Copies the bytes out as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Releases the buffer now.
    pub fn release(self) {
        drop(self);
    }

    /// Gives up ownership without releasing. The caller must pass the
    /// result to [`release_raw`](Self::release_raw) exactly once.
    pub fn into_raw(self) -> KvBuffer {
        let raw = KvBuffer {
            data: self.raw.data,
            len: self.raw.len,
            capacity: self.raw.capacity,
        };
        std::mem::forget(self);
        raw
    }

    /// Releases a buffer obtained from [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `raw` must not have been released before.
    pub unsafe fn release_raw(raw: KvBuffer) {
        kv_buffer_free(raw);
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        let raw = std::mem::replace(&mut self.raw, KvBuffer::empty());
        // SAFETY: from_raw adopted a live buffer and nothing else frees it.
        unsafe { kv_buffer_free(raw) };
    }
}

impl AsRef<[u8]> for OwnedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuffer")
            .field("len", &self.raw.len)
            .finish()
    }
}
