//! Drives the exported functions the way a foreign caller does.

use kvbridge_ffi::*;
use parking_lot::Mutex;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

/// Callback slots and the buffer counter are process-wide.
static SERIAL: Mutex<()> = parking_lot::const_mutex(());

fn s(text: &str) -> KvStr {
    KvStr::from_str(text)
}

unsafe fn open(root: &str, id: &str) -> KvHandle {
    kv_open_with_id(s(id), KvMode::SingleProcess as i32, KvStr::null(), s(root), 0)
}

#[test]
fn repeated_buffer_reads_leave_nothing_outstanding() {
    let _serial = SERIAL.lock();
    let dir = tempdir().unwrap();
    unsafe {
        let h = open(dir.path().to_str().unwrap(), "leaks");
        assert!(kv_set_bytes(h, s("blob"), s(&"x".repeat(1000))));
        for i in 0..20 {
            assert!(kv_set_i32(h, s(&format!("k{i}")), i));
        }

        let before = kv_outstanding_buffers();
        for _ in 0..100 {
            let value = kv_get_bytes(h, s("blob"));
            assert_eq!(value.len, 1000);
            kv_buffer_free(value);

            let mut count = 0usize;
            let keys = kv_all_keys(h, &mut count, false);
            assert_eq!(count, 21);
            for i in 0..count {
                kv_buffer_free(std::ptr::read(keys.add(i)));
            }
            kv_buffer_array_free(keys, count);

            kv_buffer_free(kv_mmap_id(h));
            kv_buffer_free(kv_get_bytes(h, s("absent")));
        }
        assert_eq!(kv_outstanding_buffers(), before);
        kv_close(h);
    }
}

static RECOVER_CALLS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn always_recover(_mmap_id: KvStr, _error_type: KvErrorType) -> i32 {
    RECOVER_CALLS.fetch_add(1, Ordering::SeqCst);
    KvRecoverStrategy::Recover as i32
}

#[test]
fn error_callback_chooses_recovery() {
    let _serial = SERIAL.lock();
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    unsafe {
        let h = open(root, "fragile");
        for i in 0..5 {
            kv_set_u32(h, s(&format!("k{i}")), i);
        }
        kv_sync(h, true);
        kv_close(h);

        let path = dir.path().join("fragile");
        let mut data = fs::read(&path).unwrap();
        data[17] ^= 0x5A;
        fs::write(&path, &data).unwrap();

        kv_set_error_callback(Some(always_recover));
        let h = open(root, "fragile");
        kv_set_error_callback(None);

        assert_eq!(RECOVER_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(kv_count(h, false), 5);
        assert_eq!(kv_get_u32(h, s("k4"), 0), 4);
        kv_close(h);
    }
}

static LOG_LINES: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

extern "C" fn collect_log(
    level: KvLogLevel,
    _file: KvStr,
    line: i32,
    _function: KvStr,
    message: KvStr,
) {
    assert!(line > 0);
    let message = unsafe { message.as_str() }.unwrap_or_default().to_string();
    LOG_LINES.lock().push(format!("{level:?} {message}"));
}

#[test]
fn log_callback_receives_records() {
    let _serial = SERIAL.lock();
    let dir = tempdir().unwrap();
    unsafe {
        assert!(kv_initialize(
            s(dir.path().to_str().unwrap()),
            KvLogLevel::Info as i32,
            Some(collect_log)
        ));
        let h = kv_open_default(KvMode::SingleProcess as i32, KvStr::null());
        assert!(!h.is_null());
        kv_set_log_callback(None);

        let lines = LOG_LINES.lock();
        assert!(lines.iter().any(|l| l.starts_with("Info") && l.contains("root dir")));
        assert!(lines.iter().any(|l| l.contains("kvbridge.default")));
    }
    kv_on_exit();
}

#[test]
fn last_error_explains_failure() {
    let _serial = SERIAL.lock();
    assert!(!unsafe { kv_set_bool(KvHandle(987_654), s("k"), true) });
    let message = unsafe { std::ffi::CStr::from_ptr(kv_last_error()) };
    assert!(message.to_str().unwrap().contains("closed"));
}

#[cfg(target_os = "linux")]
fn open_fds() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

#[cfg(target_os = "linux")]
#[test]
fn removed_stores_release_their_files() {
    let _serial = SERIAL.lock();
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    let before = open_fds();
    unsafe {
        for i in 0..20 {
            let id = format!("gone{i}");
            let h = open(root, &id);
            assert!(kv_set_i32(h, s("k"), i));
            // The handle is never used again.
            assert!(kv_remove_storage(s(&id), s(root)));
        }
    }
    let after = open_fds();
    assert!(after <= before + 2, "fds before={before} after={after}");
}
