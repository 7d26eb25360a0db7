//! Native buffers are released exactly once, whichever way they are read.

use kvbridge::{open, OpenOptions};
use kvbridge_ffi::kv_outstanding_buffers;
use tempfile::tempdir;

// The only test in this binary, so nothing else moves the counter.
#[test]
fn repeated_reads_do_not_grow_outstanding_buffers() {
    let dir = tempdir().unwrap();
    let kv = open(&OpenOptions::new("buffers").root(dir.path())).unwrap();
    kv.set_string("text", &"abc".repeat(300));
    for i in 0..50 {
        kv.set(&format!("n{i}"), i);
    }

    let before = kv_outstanding_buffers();
    for _ in 0..200 {
        assert_eq!(kv.get_string("text").unwrap().len(), 900);
        assert_eq!(kv.get_bytes("text").unwrap().len(), 900);

        let buffer = kv.get_string_buffer("text").unwrap();
        assert!(buffer.as_str().unwrap().starts_with("abc"));
        drop(buffer);

        kv.get_bytes_buffer("text").unwrap().release();

        let raw = kv.get_bytes_buffer("text").unwrap().into_raw();
        unsafe { kvbridge::OwnedBuffer::release_raw(raw) };

        assert_eq!(kv.all_keys().len(), 51);
        assert_eq!(kv.mmap_id(), "buffers");
        assert!(kv.get_string("absent").is_none());
        assert!(kv.crypt_key().is_none());
    }
    assert_eq!(kv_outstanding_buffers(), before);
    kv.close();
}
